//! Informix.

use tracing::warn;

use super::{base, ConstraintNameMode, DBDictionary, NameLimits, RangeContext, RangePosition};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::error::Result;
use crate::exceptions::{IntegrityViolation, StoreError};
use crate::join::{Join, JoinType};
use crate::schema::{Column, ColumnType, ForeignKey, PrimaryKey, Table};
use crate::value::SqlValue;

const RESERVED: &[&str] = &[
    "BYTE", "DATABASE", "DATETIME", "DBA", "EXCLUSIVE", "EXTEND", "FRACTION", "INDEX",
    "INT8", "LOCK", "MATCHES", "MEDIUM", "MODE", "MODIFY", "MONEY", "NCHAR", "NVARCHAR",
    "RAISE", "RESOURCE", "ROWID", "SERIAL", "SERIAL8", "SHARE", "SKIP", "SMALLFLOAT",
    "START", "STATISTICS", "SYNONYM", "TEXT", "TODAY",
];

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("Informix");
    dict.add_reserved_words(RESERVED);
    dict.limits = NameLimits {
        max_constraint_name_length: 18,
        max_index_name_length: 18,
        ..NameLimits::default()
    };
    dict.constraint_name_mode = ConstraintNameMode::After;

    let types = &mut dict.types;
    types.bit = String::from("BOOLEAN");
    types.tinyint = String::from("SMALLINT");
    types.bigint = String::from("INT8");
    types.real = String::from("SMALLFLOAT");
    types.double = String::from("FLOAT");
    types.longvarchar = String::from("TEXT");
    types.clob = String::from("TEXT");
    types.blob = String::from("BYTE");
    types.longvarbinary = String::from("BYTE");
    types.other = String::from("BYTE");
    types.time = String::from("DATETIME HOUR TO SECOND");
    types.timestamp = String::from("DATETIME YEAR TO FRACTION(3)");

    let caps = &mut dict.capabilities;
    caps.range_position = RangePosition::PreDistinct;
    caps.supports_index_of = false;
    caps.supports_deferred_constraints = false;
    caps.supports_lock_with_distinct = false;
    caps.supports_lock_with_multiple_tables = false;
    caps.supports_lock_with_order_by = false;
    caps.supports_lock_with_select_range = false;
    caps.supports_restrict_delete_action = false;
    caps.supports_null_delete_action = false;
    caps.supports_default_delete_action = false;
    caps.supports_restrict_update_action = false;

    dict.error_codes = dict.error_codes.clone().extend(
        &["-243", "-244", "-245", "-250"],
        &["-213"],
        &["-268", "-239", "-691", "-692", "-391"],
    );

    let gen = &mut dict.generators;
    gen.substring = substring;
    gen.select_range = select_range;
    gen.add_primary_key = add_primary_key;
    gen.add_foreign_key = add_foreign_key;
    gen.preferred_type = preferred_type;
    gen.type_name = type_name;
    gen.set_long = set_long;
    gen.reclassify = reclassify;
    gen.native_join = native_join;
    dict
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

/// `SELECT SKIP m FIRST n ...`.
fn select_range(_dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    if ctx.start != 0 {
        buf.append(format!(" SKIP {}", ctx.start));
    }
    if ctx.is_bounded() {
        buf.append(format!(" FIRST {}", ctx.length()));
    }
}

/// `ALTER TABLE t ADD CONSTRAINT PRIMARY KEY (...) CONSTRAINT name`.
fn add_primary_key(dict: &DBDictionary, table: &Table, pk: &PrimaryKey) -> Vec<String> {
    vec![format!(
        "ALTER TABLE {} ADD CONSTRAINT {}",
        dict.full_table_name(table),
        dict.primary_key_constraint(pk)
    )]
}

fn add_foreign_key(dict: &DBDictionary, table: &Table, fk: &ForeignKey) -> Vec<String> {
    dict.foreign_key_constraint(fk)
        .map(|constraint| {
            vec![format!(
                "ALTER TABLE {} ADD CONSTRAINT {constraint}",
                dict.full_table_name(table)
            )]
        })
        .unwrap_or_default()
}

fn preferred_type(_dict: &DBDictionary, ty: ColumnType) -> ColumnType {
    match ty {
        ColumnType::Binary | ColumnType::Varbinary => ColumnType::Blob,
        other => other,
    }
}

/// Auto-assigned columns are `SERIAL` or `SERIAL8`.
fn type_name(dict: &DBDictionary, col: &Column) -> String {
    if col.auto_assigned {
        return String::from(if col.column_type == ColumnType::BigInt {
            "SERIAL8"
        } else {
            "SERIAL"
        });
    }
    base::type_name(dict, col)
}

/// `i64::MIN` is the NULL sentinel of `INT8`.
fn set_long(_dict: &DBDictionary, value: i64, col: Option<&Column>) -> SqlValue {
    if value == i64::MIN {
        warn!(
            column = col.map_or("?", |c| c.name.as_str()),
            "Informix cannot store the minimum 64-bit value, binding {} instead",
            i64::MIN + 1
        );
        return SqlValue::Int(i64::MIN + 1);
    }
    SqlValue::Int(value)
}

fn reclassify(dict: &DBDictionary, err: StoreError) -> StoreError {
    base::reclassify_vendor(
        dict,
        err,
        &[
            (-268, IntegrityViolation::UniqueConstraint),
            (-239, IntegrityViolation::UniqueConstraint),
            (-691, IntegrityViolation::ForeignKey),
            (-692, IntegrityViolation::ForeignKey),
            (-391, IntegrityViolation::NotNull),
        ],
    )
}

/// `FROM a t0, OUTER b t1 WHERE ...`.
fn native_join(
    dict: &DBDictionary,
    join: &Join,
    from: &mut SqlBuffer,
    conditions: &mut Vec<SqlBuffer>,
) -> Result<()> {
    if join.join_type() != JoinType::Outer {
        return dict.append_traditional_join(join, from, conditions);
    }
    let second = join.second();
    from.append(format!(
        ", OUTER {} {}",
        dict.full_table_name(&second.table),
        second.alias
    ));
    let mut condition = SqlBuffer::new();
    join.append_condition(&mut condition);
    conditions.push(condition);
    Ok(())
}
