//! solidDB.

use std::sync::Arc;

use super::{base, DBDictionary, RangePosition};
use crate::boolean::IntBoolean;
use crate::buffer::{FilterValue, SqlBuffer};
use crate::error::Result;
use crate::exceptions::{IntegrityViolation, StoreError};

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("solidDB");
    dict.add_reserved_words(&["LIMIT", "OFFSET", "ROWNUM", "ROWID", "ROWVER"]);
    dict.boolean_representation = Arc::new(IntBoolean::new(1, 0));

    let types = &mut dict.types;
    types.bit = String::from("TINYINT");
    types.boolean = String::from("TINYINT");
    types.double = String::from("DOUBLE PRECISION");
    types.longvarchar = String::from("LONG VARCHAR");
    types.clob = String::from("LONG VARCHAR");
    types.longvarbinary = String::from("LONG VARBINARY");
    types.blob = String::from("LONG VARBINARY");
    types.other = String::from("LONG VARBINARY");

    let caps = &mut dict.capabilities;
    caps.range_position = RangePosition::PostLock;
    caps.supports_auto_assign = false;
    caps.supports_deferred_constraints = false;
    caps.supports_lock_with_distinct = false;
    caps.supports_lock_with_outer_join = false;
    caps.supports_default_delete_action = false;

    dict.error_codes = dict
        .error_codes
        .clone()
        .extend(&["10006", "10079"], &[], &["10005", "10029"]);

    let gen = &mut dict.generators;
    gen.substring = substring;
    gen.index_of = index_of;
    gen.reclassify = reclassify;
    dict
}

/// `SUBSTRING(s, a, n)` with a mandatory length.
fn substring(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    base::substring_call_with_length(buf, "SUBSTRING", "LENGTH", source, start, end);
}

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

fn reclassify(dict: &DBDictionary, err: StoreError) -> StoreError {
    base::reclassify_vendor(
        dict,
        err,
        &[
            (10005, IntegrityViolation::UniqueConstraint),
            (10029, IntegrityViolation::ForeignKey),
        ],
    )
}
