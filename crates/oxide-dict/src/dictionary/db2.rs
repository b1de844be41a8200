//! Shared setup of the DB2 family (DB2 itself is not shipped; Derby builds
//! on this).

use std::sync::Arc;

use super::{base, DBDictionary, RangeContext};
use crate::boolean::IntBoolean;
use crate::buffer::{FilterValue, SqlBuffer};
use crate::error::Result;

const RESERVED: &[&str] = &[
    "AFTER", "ALIAS", "BUFFERPOOL", "CAPTURE", "CCSID", "COLLECTION", "CONCAT", "DATA",
    "DAYS", "DB2GENERAL", "DB2SQL", "DBINFO", "EDITPROC", "ERASE", "EXCLUSIVE", "EXTERNAL",
    "FENCED", "FIELDPROC", "HOURS", "IMMEDIATE", "INHERIT", "LOCKMAX", "LOCKSIZE",
    "MICROSECOND", "MICROSECONDS", "MINUTES", "MONTHS", "NODENAME", "NODENUMBER", "NULLS",
    "OBID", "PACKAGE", "PART", "PARTITION", "PIECESIZE", "PLAN", "PRIQTY", "PROGRAM", "PSID",
    "QUERYNO", "SECONDS", "SECQTY", "STOGROUP", "SUBPAGES", "SYNONYM", "TABLESPACE",
    "VALIDPROC", "VARIABLE", "VCAT", "VOLUMES", "WLM", "YEARS",
];

/// Applies the family defaults to `dict`.
pub(super) fn configure(dict: &mut DBDictionary) {
    dict.add_reserved_words(RESERVED);
    dict.boolean_representation = Arc::new(IntBoolean::new(1, 0));
    dict.for_update_clause = Some(String::from("FOR UPDATE WITH RR"));
    dict.auto_assign_clause = Some(String::from("GENERATED BY DEFAULT AS IDENTITY"));

    let types = &mut dict.types;
    types.bit = String::from("SMALLINT");
    types.boolean = String::from("SMALLINT");
    types.tinyint = String::from("SMALLINT");
    types.longvarchar = String::from("LONG VARCHAR");
    types.binary = String::from("BLOB");
    types.varbinary = String::from("BLOB");
    types.longvarbinary = String::from("BLOB");
    types.other = String::from("BLOB");

    let caps = &mut dict.capabilities;
    caps.supports_lock_with_distinct = false;
    caps.supports_lock_with_outer_join = false;
    caps.supports_lock_with_multiple_tables = false;
    caps.supports_lock_with_order_by = false;
    caps.supports_lock_with_select_range = false;
    caps.supports_default_delete_action = false;
    caps.supports_null_unique_columns = false;

    let gen = &mut dict.generators;
    gen.substring = substring;
    gen.index_of = index_of;
    gen.select_range = select_range;
}

/// `SUBSTR(s, a[, n])`.
fn substring(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    base::substring_call(buf, "SUBSTR", source, start, end);
}

/// `(LOCATE(needle, haystack[, from + 1]) - 1)`.
fn index_of(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    haystack: &FilterValue,
    needle: &FilterValue,
    from: Option<&FilterValue>,
) -> Result<()> {
    base::locate_call(buf, "LOCATE", needle, haystack, from);
    Ok(())
}

/// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`.
fn select_range(_dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    if ctx.start != 0 {
        buf.append(format!(" OFFSET {} ROWS", ctx.start));
    }
    if ctx.is_bounded() {
        buf.append(format!(" FETCH NEXT {} ROWS ONLY", ctx.length()));
    }
}
