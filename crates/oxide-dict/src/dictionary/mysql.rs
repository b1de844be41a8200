//! MySQL and MariaDB.

use super::{base, Capabilities, DBDictionary, NameLimits, RangeContext, UNBOUNDED};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::driver::DriverMetadata;
use crate::exceptions::{IntegrityViolation, StoreError};
use crate::schema::{PrimaryKey, Table};

const RESERVED: &[&str] = &[
    "ACCESSIBLE", "ANALYZE", "BIGINT", "BINARY", "BLOB", "CHANGE", "DATABASE", "DATABASES",
    "DELAYED", "DISTINCTROW", "DIV", "DUAL", "ENCLOSED", "ESCAPED", "EXPLAIN", "FULLTEXT",
    "HIGH_PRIORITY", "IGNORE", "INDEX", "INFILE", "KEYS", "KILL", "LIMIT", "LINES", "LOAD",
    "LOCK", "LONG", "LONGBLOB", "LONGTEXT", "LOW_PRIORITY", "MEDIUMINT", "MEDIUMTEXT", "MOD",
    "OPTIMIZE", "OUTFILE", "PURGE", "REGEXP", "RENAME", "REPLACE", "REQUIRE", "RLIKE",
    "SCHEMAS", "SEPARATOR", "SHOW", "SPATIAL", "STARTING", "STRAIGHT_JOIN", "TERMINATED",
    "TINYBLOB", "TINYINT", "TINYTEXT", "UNLOCK", "UNSIGNED", "USE", "XOR", "ZEROFILL",
];

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("MySQL");
    dict.add_reserved_words(RESERVED);
    dict.limits = NameLimits::uniform(64);
    dict.leading_delimiter = String::from("`");
    dict.trailing_delimiter = String::from("`");
    dict.auto_assign_clause = Some(String::from("AUTO_INCREMENT"));
    dict.table_type = Some(String::from("innodb"));

    let types = &mut dict.types;
    types.boolean = String::from("BIT");
    types.double = String::from("DOUBLE PRECISION");
    types.longvarchar = String::from("TEXT");
    types.clob = String::from("TEXT");
    types.longvarbinary = String::from("LONG VARBINARY");
    types.blob = String::from("BLOB");
    types.timestamp = String::from("DATETIME");
    types.other = String::from("BLOB");

    let caps = &mut dict.capabilities;
    caps.supports_deferred_constraints = false;
    caps.requires_alias_for_subselect = true;
    caps.supports_lock_with_distinct = false;
    caps.supports_lock_with_outer_join = false;
    caps.supports_default_delete_action = false;
    caps.supports_cascade_update_action = true;
    caps.supports_null_update_action = true;
    caps.use_schema_name = false;

    dict.error_codes = dict.error_codes.clone().extend(
        &["1205", "1213"],
        &["1317"],
        &["1062", "1451", "1452", "1048"],
    );

    let gen = &mut dict.generators;
    gen.index_of = index_of;
    gen.select_range = select_range;
    gen.create_table = create_table;
    gen.drop_primary_key = drop_primary_key;
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
) -> crate::error::Result<()> {
    base::locate_call(buf, "LOCATE", needle, haystack, from);
    Ok(())
}

/// `LIMIT offset, count`. MySQL has no unbounded form; the manual's advice
/// is the largest unsigned value as count.
fn select_range(_dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    buf.append(" LIMIT ");
    if ctx.start != 0 {
        buf.append(format!("{}, ", ctx.start));
    }
    if ctx.is_bounded() {
        buf.append(ctx.length().to_string());
    } else {
        buf.append(UNBOUNDED.to_string());
    }
}

/// Appends the storage engine.
fn create_table(dict: &DBDictionary, table: &Table) -> Vec<String> {
    let mut sql = base::create_table_statement(dict, table);
    if let Some(engine) = &dict.table_type {
        sql.push_str(" ENGINE = ");
        sql.push_str(engine);
    }
    vec![sql]
}

fn drop_primary_key(dict: &DBDictionary, table: &Table, _pk: &PrimaryKey) -> Vec<String> {
    vec![format!(
        "ALTER TABLE {} DROP PRIMARY KEY",
        dict.full_table_name(table)
    )]
}

/// Subselects arrived in 4.1.
fn connected_configuration(
    _dict: &DBDictionary,
    _meta: &DriverMetadata,
    version: (u32, u32),
    caps: &mut Capabilities,
) {
    if version < (4, 1) {
        caps.supports_subselect = false;
        caps.supports_correlated_subselect = false;
    }
}

fn reclassify(dict: &DBDictionary, err: StoreError) -> StoreError {
    base::reclassify_vendor(
        dict,
        err,
        &[
            (1062, IntegrityViolation::UniqueConstraint),
            (1451, IntegrityViolation::ForeignKey),
            (1452, IntegrityViolation::ForeignKey),
            (1048, IntegrityViolation::NotNull),
        ],
    )
}
