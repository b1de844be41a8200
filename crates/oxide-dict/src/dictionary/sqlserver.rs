//! Microsoft SQL Server.

use super::{base, Capabilities, DBDictionary, RangeContext, RangePosition};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::driver::DriverMetadata;
use crate::error::Result;
use crate::exceptions::{IntegrityViolation, StoreError};

const RESERVED: &[&str] = &[
    "BACKUP", "BREAK", "BROWSE", "BULK", "CHECKPOINT", "CLUSTERED", "COMPUTE", "CONTAINS",
    "CONTAINSTABLE", "DATABASE", "DBCC", "DENY", "DISK", "DISTRIBUTED", "DUMP", "ERRLVL",
    "EXIT", "FILE", "FILLFACTOR", "FREETEXT", "FREETEXTTABLE", "FUNCTION", "HOLDLOCK",
    "IDENTITY_INSERT", "IDENTITYCOL", "IF", "INDEX", "KILL", "LINENO", "LOAD", "NOCHECK",
    "NONCLUSTERED", "OFF", "OFFSETS", "OPENDATASOURCE", "OPENQUERY", "OPENROWSET", "OPENXML",
    "OVER", "PERCENT", "PIVOT", "PLAN", "PRINT", "PROC", "RAISERROR", "READTEXT",
    "RECONFIGURE", "REPLICATION", "RETURN", "REVERT", "ROWCOUNT", "ROWGUIDCOL", "RULE",
    "SAVE", "SECURITYAUDIT", "SETUSER", "SHUTDOWN", "STATISTICS", "TABLESAMPLE", "TEXTSIZE",
    "TOP", "TRAN", "TRIGGER", "TRUNCATE", "TSEQUAL", "UNPIVOT", "UPDATETEXT", "USE",
    "WAITFOR", "WHILE", "WRITETEXT",
];

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("Microsoft SQL Server");
    dict.add_reserved_words(RESERVED);
    dict.leading_delimiter = String::from("[");
    dict.trailing_delimiter = String::from("]");
    dict.for_update_clause = None;
    dict.table_for_update_clause = Some(String::from("WITH (UPDLOCK)"));
    dict.auto_assign_clause = Some(String::from("IDENTITY"));

    let types = &mut dict.types;
    types.boolean = String::from("BIT");
    types.double = String::from("FLOAT(32)");
    types.longvarchar = String::from("TEXT");
    types.clob = String::from("VARCHAR(MAX)");
    types.longvarbinary = String::from("IMAGE");
    types.blob = String::from("VARBINARY(MAX)");
    types.timestamp = String::from("DATETIME2");
    types.other = String::from("IMAGE");

    let caps = &mut dict.capabilities;
    caps.supports_deferred_constraints = false;
    caps.supports_lock_with_distinct = false;
    caps.supports_restrict_delete_action = false;
    caps.supports_restrict_update_action = false;
    caps.supports_cascade_update_action = true;
    caps.supports_null_update_action = true;
    caps.supports_default_update_action = true;
    caps.requires_alias_for_subselect = true;

    dict.error_codes = dict.error_codes.clone().extend(
        &["1205", "1222"],
        &["HYT00"],
        &["2627", "2601", "547", "515"],
    );

    let gen = &mut dict.generators;
    gen.substring = substring;
    gen.index_of = index_of;
    gen.select_range = select_range;
    gen.connected_configuration = connected_configuration;
    gen.reclassify = reclassify;
    dict
}

/// `SUBSTRING(s, a, n)`; the length is mandatory, `LEN(s)` reaches the end.
fn substring(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    base::substring_call_with_length(buf, "SUBSTRING", "LEN", source, start, end);
}

/// `(CHARINDEX(needle, haystack[, from + 1]) - 1)`.
fn index_of(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    haystack: &FilterValue,
    needle: &FilterValue,
    from: Option<&FilterValue>,
) -> Result<()> {
    base::locate_call(buf, "CHARINDEX", needle, haystack, from);
    Ok(())
}

/// 2012 and later: `OFFSET m ROWS FETCH NEXT n ROWS ONLY`, which needs an
/// ORDER BY. Older servers only know `SELECT TOP n`.
fn select_range(dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    if dict.capabilities().range_position == RangePosition::PostDistinct {
        if ctx.is_bounded() {
            buf.append(format!(" TOP {}", ctx.end));
        }
        return;
    }
    if !ctx.has_order_by {
        buf.append(" ORDER BY (SELECT NULL)");
    }
    buf.append(format!(" OFFSET {} ROWS", ctx.start));
    if ctx.is_bounded() {
        buf.append(format!(" FETCH NEXT {} ROWS ONLY", ctx.length()));
    }
}

fn connected_configuration(
    _dict: &DBDictionary,
    _meta: &DriverMetadata,
    version: (u32, u32),
    caps: &mut Capabilities,
) {
    if version.0 < 11 {
        caps.range_position = RangePosition::PostDistinct;
        caps.supports_select_start_index = false;
    }
}

fn reclassify(dict: &DBDictionary, err: StoreError) -> StoreError {
    base::reclassify_vendor(
        dict,
        err,
        &[
            (2627, IntegrityViolation::UniqueConstraint),
            (2601, IntegrityViolation::UniqueConstraint),
            (547, IntegrityViolation::ForeignKey),
            (515, IntegrityViolation::NotNull),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::UNBOUNDED;

    fn range(dict: &DBDictionary, ctx: RangeContext) -> String {
        let mut buf = SqlBuffer::new();
        dict.append_select_range(&mut buf, &ctx);
        buf.to_sql()
    }

    #[test]
    fn test_offset_fetch_needs_order_by() {
        let dict = dictionary();
        assert_eq!(
            range(&dict, RangeContext::new(10, 20)),
            " ORDER BY (SELECT NULL) OFFSET 10 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        let ordered = RangeContext {
            has_order_by: true,
            ..RangeContext::new(10, UNBOUNDED)
        };
        assert_eq!(range(&dict, ordered), " OFFSET 10 ROWS");
    }

    #[test]
    fn test_top_before_2012() {
        let dict = dictionary();
        dict.connected_configuration(&DriverMetadata {
            database_product_name: String::from("Microsoft SQL Server"),
            database_major_version: 10,
            database_minor_version: 50,
            ..DriverMetadata::default()
        });
        assert!(!dict.capabilities().supports_select_start_index);
        assert_eq!(range(&dict, RangeContext::new(0, 25)), " TOP 25");
        assert_eq!(range(&dict, RangeContext::new(5, 25)), " TOP 25");
    }

    #[test]
    fn test_open_ended_substring_uses_len() {
        let dict = dictionary();
        let mut buf = SqlBuffer::new();
        dict.substring(&mut buf, &FilterValue::expr("t0.S"), &FilterValue::Number(2), None);
        assert_eq!(buf.to_sql(), "SUBSTRING(t0.S, 3, LEN(t0.S))");
    }
}
