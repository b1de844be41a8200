//! Microsoft Access (Jet / ACE) through ODBC.

use super::{base, DBDictionary, NameLimits, RangeContext, RangePosition};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::error::Result;
use crate::schema::{Column, ColumnType};
use crate::value::SqlValue;

const RESERVED: &[&str] = &[
    "COUNTER", "CURRENCY", "DATABASE", "DATETIME", "DISALLOW", "DISTINCTROW", "IEEEDOUBLE",
    "IEEESINGLE", "IGNORE", "INDEX", "LONGBINARY", "LONGTEXT", "MEMO", "MOD", "OLEOBJECT",
    "OWNERACCESS", "PARAMETERS", "PERCENT", "PIVOT", "SINGLE", "TEXT", "TOP", "TRANSFORM",
    "YESNO",
];

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("Microsoft Access");
    dict.add_reserved_words(RESERVED);
    dict.limits = NameLimits::uniform(64);
    dict.leading_delimiter = String::from("[");
    dict.trailing_delimiter = String::from("]");
    dict.for_update_clause = None;
    dict.auto_assign_type_name = Some(String::from("COUNTER"));

    let types = &mut dict.types;
    types.boolean = String::from("BIT");
    types.tinyint = String::from("SMALLINT");
    types.bigint = String::from("DECIMAL(19, 0)");
    types.float = String::from("DOUBLE");
    types.varchar = String::from("TEXT");
    types.char = String::from("TEXT");
    types.longvarchar = String::from("MEMO");
    types.clob = String::from("MEMO");
    types.date = String::from("DATETIME");
    types.time = String::from("DATETIME");
    types.timestamp = String::from("DATETIME");
    types.varbinary = String::from("BINARY");
    types.longvarbinary = String::from("LONGBINARY");
    types.blob = String::from("LONGBINARY");
    types.other = String::from("LONGBINARY");

    let caps = &mut dict.capabilities;
    caps.range_position = RangePosition::PostDistinct;
    caps.supports_select_start_index = false;
    caps.supports_select_for_update = false;
    caps.supports_query_timeout = false;
    caps.supports_deferred_constraints = false;
    caps.supports_restrict_delete_action = false;
    caps.supports_default_delete_action = false;
    caps.supports_restrict_update_action = false;
    caps.supports_cascade_update_action = true;
    caps.supports_null_update_action = true;
    caps.use_schema_name = false;
    caps.requires_alias_for_subselect = true;

    let gen = &mut dict.generators;
    gen.substring = substring;
    gen.index_of = index_of;
    gen.select_range = select_range;
    gen.set_big_decimal = set_big_decimal;
    dict
}

/// `MID(s, a[, n])`.
fn substring(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    base::substring_call(buf, "MID", source, start, end);
}

/// `(INSTR([from + 1, ]haystack, needle) - 1)`; the start comes first.
fn index_of(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    haystack: &FilterValue,
    needle: &FilterValue,
    from: Option<&FilterValue>,
) -> Result<()> {
    buf.append("(INSTR(");
    if let Some(from) = from {
        from.append_plus(buf, 1);
        buf.append(", ");
    }
    haystack.append_to(buf);
    buf.append(", ");
    needle.append_to(buf);
    buf.append(") - 1)");
    Ok(())
}

/// `SELECT TOP n`; the offset is skipped client-side.
fn select_range(_dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    if ctx.is_bounded() {
        buf.append(format!(" TOP {}", ctx.end));
    }
}

/// The ODBC bridge mangles decimals; bind doubles.
fn set_big_decimal(_dict: &DBDictionary, value: &str, _col: Option<&Column>) -> Result<SqlValue> {
    base::decimal_as_double(value)
}
