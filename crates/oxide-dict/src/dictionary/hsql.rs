//! HSQLDB.
//!
//! 1.x pages with a leading `LIMIT offset count` right after SELECT, where a
//! count of `0` means "no limit"; 2.x understands the trailing
//! `LIMIT n OFFSET m`.

use super::{base, Capabilities, DBDictionary, RangeContext, RangePosition};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::driver::DriverMetadata;
use crate::error::Result;
use crate::exceptions::{IntegrityViolation, StoreError};
use crate::schema::Column;
use crate::value::SqlValue;

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("HSQL");
    dict.add_reserved_words(&["LIMIT", "OFFSET", "TOP"]);
    dict.auto_assign_clause = Some(String::from("GENERATED BY DEFAULT AS IDENTITY"));

    let types = &mut dict.types;
    types.bit = String::from("BOOLEAN");
    types.longvarchar = String::from("LONGVARCHAR");
    types.longvarbinary = String::from("LONGVARBINARY");

    let caps = &mut dict.capabilities;
    caps.supports_deferred_constraints = false;
    caps.supports_select_for_update = false;
    caps.supports_cascade_update_action = true;
    caps.supports_null_update_action = true;
    caps.supports_default_update_action = true;

    dict.error_codes = dict
        .error_codes
        .clone()
        .extend(&["40001"], &[], &["-104", "-177", "-10"]);

    let gen = &mut dict.generators;
    gen.index_of = index_of;
    gen.select_range = select_range;
    gen.set_big_decimal = set_big_decimal;
    gen.connected_configuration = connected_configuration;
    gen.reclassify = reclassify;
    dict
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

fn select_range(dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    if dict.capabilities().range_position == RangePosition::PreDistinct {
        let count = if ctx.is_bounded() { ctx.length() } else { 0 };
        buf.append(format!(" LIMIT {} {count}", ctx.start));
    } else {
        base::select_range(dict, buf, ctx);
    }
}

/// The 1.x driver rejects decimals bound to floating point columns.
fn set_big_decimal(dict: &DBDictionary, value: &str, col: Option<&Column>) -> Result<SqlValue> {
    match col {
        Some(col) if col.column_type.is_floating() => base::decimal_as_double(value),
        _ => base::set_big_decimal(dict, value, col),
    }
}

fn connected_configuration(
    _dict: &DBDictionary,
    _meta: &DriverMetadata,
    version: (u32, u32),
    caps: &mut Capabilities,
) {
    if version.0 < 2 {
        caps.range_position = RangePosition::PreDistinct;
        caps.supports_subselect = false;
    } else {
        caps.supports_select_for_update = true;
    }
}

fn reclassify(dict: &DBDictionary, err: StoreError) -> StoreError {
    base::reclassify_vendor(
        dict,
        err,
        &[
            (-104, IntegrityViolation::UniqueConstraint),
            (-177, IntegrityViolation::ForeignKey),
            (-10, IntegrityViolation::NotNull),
        ],
    )
}
