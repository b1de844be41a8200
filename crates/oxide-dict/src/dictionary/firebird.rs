//! Firebird.

use std::sync::Arc;

use super::{base, DBDictionary, NameLimits, RangeContext, RangePosition};
use crate::boolean::IntBoolean;
use crate::buffer::{FilterValue, SqlBuffer};
use crate::error::Result;
use crate::exceptions::{IntegrityViolation, StoreError};
use crate::schema::ColumnType;

const RESERVED: &[&str] = &[
    "ACTIVE", "ADMIN", "AFTER", "ASCENDING", "BASE_NAME", "BEFORE", "BLOB", "CACHE",
    "CHECK_POINT_LENGTH", "COMPUTED", "CONDITIONAL", "CONTAINING", "CSTRING", "DATABASE",
    "DESCENDING", "DO", "ENTRY_POINT", "EXIT", "FILE", "FILTER", "FUNCTION", "GDSCODE",
    "GENERATOR", "GEN_ID", "GROUP_COMMIT_WAIT_TIME", "IF", "INACTIVE", "INPUT_TYPE", "LENGTH",
    "LOGFILE", "LOG_BUFFER_SIZE", "MANUAL", "MAXIMUM_SEGMENT", "MERGE", "MESSAGE",
    "MODULE_NAME", "NUM_LOG_BUFFERS", "OUTPUT_TYPE", "OVERFLOW", "PAGE", "PAGES", "PAGE_SIZE",
    "PARAMETER", "PASSWORD", "PLAN", "POST_EVENT", "RAW_PARTITIONS", "RDB$DB_KEY",
    "RECORD_VERSION", "RELEASE", "RESERV", "RESERVING", "RETAIN", "RETURNING_VALUES",
    "RETURNS", "SEGMENT", "SHADOW", "SHARED", "SINGULAR", "SKIP", "SNAPSHOT", "SORT",
    "STABILITY", "STARTING", "STARTS", "STATISTICS", "SUB_TYPE", "SUSPEND", "TRIGGER",
    "VARIABLE", "WAIT", "WHILE",
];

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("Firebird");
    dict.add_reserved_words(RESERVED);
    dict.limits = NameLimits::uniform(31);
    dict.boolean_representation = Arc::new(IntBoolean::new(1, 0));
    dict.for_update_clause = Some(String::from("FOR UPDATE WITH LOCK"));

    let types = &mut dict.types;
    types.bit = String::from("SMALLINT");
    types.boolean = String::from("SMALLINT");
    types.tinyint = String::from("SMALLINT");
    types.double = String::from("DOUBLE PRECISION");
    types.longvarchar = String::from("BLOB SUB_TYPE 1");
    types.clob = String::from("BLOB SUB_TYPE 1");
    types.blob = String::from("BLOB SUB_TYPE 0");
    types.other = String::from("BLOB SUB_TYPE 0");

    let caps = &mut dict.capabilities;
    caps.range_position = RangePosition::PreDistinct;
    caps.supports_auto_assign = false;
    caps.supports_deferred_constraints = false;
    caps.supports_lock_with_distinct = false;
    caps.supports_lock_with_outer_join = false;
    caps.supports_lock_with_multiple_tables = false;
    caps.supports_cascade_update_action = true;
    caps.supports_null_update_action = true;
    caps.supports_default_update_action = true;
    caps.use_schema_name = false;

    dict.error_codes = dict.error_codes.clone().extend(
        &["335544345", "335544336"],
        &["335544794"],
        &["335544665", "335544349", "335544466", "335544347"],
    );

    let gen = &mut dict.generators;
    gen.substring = substring;
    gen.index_of = index_of;
    gen.select_range = select_range;
    gen.preferred_type = preferred_type;
    gen.reclassify = reclassify;
    dict
}

/// `SUBSTRING(s FROM a[ FOR n])`.
fn substring(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    buf.append("SUBSTRING(");
    source.append_to(buf);
    buf.append(" FROM ");
    start.append_plus(buf, 1);
    if let Some(end) = end {
        buf.append(" FOR ");
        FilterValue::append_difference(end, start, buf);
    }
    buf.append(")");
}

/// Three-argument `POSITION` exists from 2.1; older servers search a
/// substring with `POSITION(x IN y)`.
fn index_of(
    dict: &DBDictionary,
    buf: &mut SqlBuffer,
    haystack: &FilterValue,
    needle: &FilterValue,
    from: Option<&FilterValue>,
) -> Result<()> {
    match dict.server_version() {
        Some(version) if version < (2, 1) => base::index_of(dict, buf, haystack, needle, from),
        _ => {
            base::locate_call(buf, "POSITION", needle, haystack, from);
            Ok(())
        }
    }
}

/// `SELECT FIRST n SKIP m ...`.
fn select_range(_dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    if ctx.is_bounded() {
        buf.append(format!(" FIRST {}", ctx.length()));
    }
    if ctx.start != 0 {
        buf.append(format!(" SKIP {}", ctx.start));
    }
}

/// Binary data only fits in blobs.
fn preferred_type(_dict: &DBDictionary, ty: ColumnType) -> ColumnType {
    match ty {
        ColumnType::Binary | ColumnType::Varbinary | ColumnType::LongVarbinary => ColumnType::Blob,
        other => other,
    }
}

fn reclassify(dict: &DBDictionary, err: StoreError) -> StoreError {
    base::reclassify_vendor(
        dict,
        err,
        &[
            (335_544_665, IntegrityViolation::UniqueConstraint),
            (335_544_349, IntegrityViolation::UniqueConstraint),
            (335_544_466, IntegrityViolation::ForeignKey),
            (335_544_347, IntegrityViolation::NotNull),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::UNBOUNDED;
    use crate::driver::DriverMetadata;
    use crate::schema::Column;

    fn render(f: impl FnOnce(&mut SqlBuffer)) -> String {
        let mut buf = SqlBuffer::new();
        f(&mut buf);
        buf.to_sql()
    }

    #[test]
    fn test_substring_from_for() {
        let dict = dictionary();
        let s = FilterValue::expr("t0.S");
        assert_eq!(
            render(|b| dict.substring(b, &s, &FilterValue::Number(1), Some(&FilterValue::Number(3)))),
            "SUBSTRING(t0.S FROM 2 FOR 2)"
        );
        assert_eq!(
            render(|b| dict.substring(b, &s, &FilterValue::Number(1), None)),
            "SUBSTRING(t0.S FROM 2)"
        );
    }

    #[test]
    fn test_first_skip() {
        let dict = dictionary();
        assert_eq!(render(|b| dict.append_select_range(b, &RangeContext::new(5, 15))), " FIRST 10 SKIP 5");
        assert_eq!(render(|b| dict.append_select_range(b, &RangeContext::new(5, UNBOUNDED))), " SKIP 5");
    }

    #[test]
    fn test_index_of_by_version() {
        let modern = dictionary();
        let sql = render(|b| {
            modern
                .index_of(b, &FilterValue::expr("t0.S"), &FilterValue::expr("'x'"), None)
                .unwrap();
        });
        assert_eq!(sql, "(POSITION('x', t0.S) - 1)");

        let legacy = dictionary();
        legacy.connected_configuration(&DriverMetadata {
            database_product_version: String::from("WI-V2.0.7.13318 Firebird 2.0"),
            ..DriverMetadata::default()
        });
        let sql = render(|b| {
            legacy
                .index_of(
                    b,
                    &FilterValue::expr("t0.S"),
                    &FilterValue::expr("'x'"),
                    Some(&FilterValue::Number(2)),
                )
                .unwrap();
        });
        assert_eq!(sql, "(POSITION('x' IN SUBSTRING(t0.S FROM 3)) - 1 + 2)");
    }

    #[test]
    fn test_binary_stored_as_blob() {
        let dict = dictionary();
        let col = Column::new("DATA", ColumnType::Varbinary).with_size(16);
        assert_eq!(dict.type_name(&col), "BLOB SUB_TYPE 0");
        let flag = Column::new("ACTIVE", ColumnType::Boolean);
        assert_eq!(dict.type_name(&flag), "SMALLINT");
    }
}
