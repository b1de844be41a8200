//! Default generators. Dialects reuse these and the call-shape helpers
//! below when only a function name or argument order differs.

use tracing::debug;

use super::{Capabilities, DBDictionary, RangeContext};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::driver::DriverMetadata;
use crate::error::{Error, Result};
use crate::exceptions::{IntegrityViolation, StoreError, StoreErrorKind};
use crate::join::Join;
use crate::schema::{Column, ColumnMetadata, ColumnType, ForeignKey, PrimaryKey, Table};
use crate::value::SqlValue;

/// `SUBSTRING(s, start + 1[, end - start])`.
pub(crate) fn substring(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    substring_call(buf, "SUBSTRING", source, start, end);
}

/// `F(s, start + 1[, end - start])` for functions taking a length.
pub(crate) fn substring_call(
    buf: &mut SqlBuffer,
    function: &str,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    buf.append(function).append("(");
    source.append_to(buf);
    buf.append(", ");
    start.append_plus(buf, 1);
    if let Some(end) = end {
        buf.append(", ");
        FilterValue::append_difference(end, start, buf);
    }
    buf.append(")");
}

/// `F(s, start + 1, end - start)`, with `LEN(s)` standing in for a missing
/// end on functions whose length argument is mandatory.
pub(crate) fn substring_call_with_length(
    buf: &mut SqlBuffer,
    function: &str,
    length_function: &str,
    source: &FilterValue,
    start: &FilterValue,
    end: Option<&FilterValue>,
) {
    buf.append(function).append("(");
    source.append_to(buf);
    buf.append(", ");
    start.append_plus(buf, 1);
    buf.append(", ");
    match end {
        Some(end) => FilterValue::append_difference(end, start, buf),
        None => {
            buf.append(length_function).append("(");
            source.append_to(buf);
            buf.append(")");
        }
    }
    buf.append(")");
}

/// `(POSITION(needle IN haystack) - 1)`, searching in the substring from
/// `from` when given and adding `from` back.
pub(crate) fn index_of(
    dict: &DBDictionary,
    buf: &mut SqlBuffer,
    haystack: &FilterValue,
    needle: &FilterValue,
    from: Option<&FilterValue>,
) -> Result<()> {
    if !dict.capabilities().supports_index_of {
        return Err(Error::unsupported(&dict.platform, "index_of"));
    }
    buf.append("(POSITION(");
    needle.append_to(buf);
    buf.append(" IN ");
    match from {
        Some(from) => dict.substring(buf, haystack, from, None),
        None => haystack.append_to(buf),
    }
    buf.append(") - 1");
    if let Some(from) = from {
        buf.append(" + ");
        from.append_to(buf);
    }
    buf.append(")");
    Ok(())
}

/// `(F(a, b[, from + 1]) - 1)` for locate-style functions with a native
/// start argument.
pub(crate) fn locate_call(
    buf: &mut SqlBuffer,
    function: &str,
    first: &FilterValue,
    second: &FilterValue,
    from: Option<&FilterValue>,
) {
    buf.append("(").append(function).append("(");
    first.append_to(buf);
    buf.append(", ");
    second.append_to(buf);
    if let Some(from) = from {
        buf.append(", ");
        from.append_plus(buf, 1);
    }
    buf.append(") - 1)");
}

/// ` LIMIT n OFFSET m`.
pub(crate) fn select_range(_dict: &DBDictionary, buf: &mut SqlBuffer, ctx: &RangeContext) {
    if ctx.is_bounded() {
        buf.append(format!(" LIMIT {}", ctx.length()));
    }
    if ctx.start != 0 {
        buf.append(format!(" OFFSET {}", ctx.start));
    }
}

/// `CREATE TABLE t (cols[, pk])`. Foreign keys are added separately once
/// every table exists.
pub(crate) fn create_table(dict: &DBDictionary, table: &Table) -> Vec<String> {
    vec![create_table_statement(dict, table)]
}

pub(crate) fn create_table_statement(dict: &DBDictionary, table: &Table) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|col| dict.column_declaration(col))
        .collect();
    if let Some(pk) = &table.primary_key {
        parts.push(dict.primary_key_constraint(pk));
    }
    format!(
        "CREATE TABLE {} ({})",
        dict.full_table_name(table),
        parts.join(", ")
    )
}

pub(crate) fn add_primary_key(dict: &DBDictionary, table: &Table, pk: &PrimaryKey) -> Vec<String> {
    if !dict.capabilities().supports_alter_primary_key {
        return vec![];
    }
    vec![format!(
        "ALTER TABLE {} ADD {}",
        dict.full_table_name(table),
        dict.primary_key_constraint(pk)
    )]
}

/// Unnamed keys cannot be dropped by name; nothing is emitted for them.
pub(crate) fn drop_primary_key(dict: &DBDictionary, table: &Table, pk: &PrimaryKey) -> Vec<String> {
    if !dict.capabilities().supports_alter_primary_key {
        return vec![];
    }
    let Some(name) = &pk.name else {
        debug!(table = %table.name, "cannot drop unnamed primary key");
        return vec![];
    };
    vec![format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        dict.full_table_name(table),
        dict.to_db_name(name)
    )]
}

pub(crate) fn add_foreign_key(dict: &DBDictionary, table: &Table, fk: &ForeignKey) -> Vec<String> {
    if !dict.capabilities().supports_foreign_keys {
        return vec![];
    }
    dict.foreign_key_constraint(fk)
        .map(|constraint| {
            vec![format!(
                "ALTER TABLE {} ADD {constraint}",
                dict.full_table_name(table)
            )]
        })
        .unwrap_or_default()
}

pub(crate) fn normalize_metadata(_dict: &DBDictionary, meta: ColumnMetadata) -> ColumnMetadata {
    meta
}

pub(crate) fn jdbc_type(_dict: &DBDictionary, code: i32, _name: &str, _size: Option<u32>) -> ColumnType {
    ColumnType::from_jdbc_code(code)
}

pub(crate) fn preferred_type(_dict: &DBDictionary, ty: ColumnType) -> ColumnType {
    ty
}

/// Declared name, or the dialect name for the (preferred) type with its
/// size. Booleans take the storage type of the boolean representation.
pub(crate) fn type_name(dict: &DBDictionary, col: &Column) -> String {
    if col.auto_assigned {
        if let Some(name) = &dict.auto_assign_type_name {
            return name.clone();
        }
    }
    if let Some(declared) = &col.type_name {
        return declared.clone();
    }
    let (ty, size) = if col.column_type.is_boolean() {
        let (ty, repr_size) = dict.boolean_representation.storage_type();
        (ty, repr_size.or(col.size))
    } else {
        (col.column_type, col.size)
    };
    let ty = dict.preferred_type(ty);
    sized_type_name(dict, dict.types.for_type(ty), ty, size, col.decimal_digits)
}

pub(crate) fn sized_type_name(
    dict: &DBDictionary,
    name: &str,
    ty: ColumnType,
    size: Option<u32>,
    digits: Option<u32>,
) -> String {
    if name.contains('(') {
        return String::from(name);
    }
    if ty.is_sized() {
        return format!("{name}({})", size.unwrap_or(dict.types.default_size));
    }
    match (ty, size, digits) {
        (ColumnType::Numeric | ColumnType::Decimal, Some(p), Some(s)) => format!("{name}({p}, {s})"),
        (ColumnType::Numeric | ColumnType::Decimal, Some(p), None) => format!("{name}({p})"),
        _ => String::from(name),
    }
}

pub(crate) fn read_value(dict: &DBDictionary, raw: SqlValue, col: &Column) -> Result<SqlValue> {
    if raw.is_null() {
        return Ok(raw);
    }
    if col.column_type.is_boolean() {
        return Ok(SqlValue::Bool(dict.boolean_representation.get_boolean(&raw)?));
    }
    Ok(raw)
}

pub(crate) fn set_long(_dict: &DBDictionary, value: i64, _col: Option<&Column>) -> SqlValue {
    SqlValue::Int(value)
}

pub(crate) fn set_big_decimal(dict: &DBDictionary, value: &str, _col: Option<&Column>) -> Result<SqlValue> {
    if dict.capabilities().store_large_numbers_as_strings {
        return Ok(SqlValue::Text(String::from(value)));
    }
    Ok(SqlValue::decimal(value))
}

/// Downgrades a decimal to a double, for drivers that mishandle decimals.
pub(crate) fn decimal_as_double(value: &str) -> Result<SqlValue> {
    value
        .parse::<f64>()
        .map(SqlValue::Float)
        .map_err(|_| Error::InvalidValue(format!("\"{value}\" is not a number")))
}

pub(crate) fn set_boolean(dict: &DBDictionary, value: bool, _col: Option<&Column>) -> SqlValue {
    dict.boolean_representation.set_boolean(value)
}

pub(crate) fn connected_configuration(
    _dict: &DBDictionary,
    _meta: &DriverMetadata,
    _version: (u32, u32),
    _caps: &mut Capabilities,
) {
}

/// Refines integrity violations from their standard SQLSTATE.
pub(crate) fn reclassify(_dict: &DBDictionary, mut err: StoreError) -> StoreError {
    if err.kind == StoreErrorKind::ReferentialIntegrity(IntegrityViolation::Unknown) {
        let violation = if err.has_code("23505") {
            IntegrityViolation::UniqueConstraint
        } else if err.has_code("23503") {
            IntegrityViolation::ForeignKey
        } else if err.has_code("23502") {
            IntegrityViolation::NotNull
        } else {
            IntegrityViolation::Unknown
        };
        err.kind = StoreErrorKind::ReferentialIntegrity(violation);
    }
    err
}

/// Integrity violation from a list of `(vendor code, violation)` pairs,
/// falling back to the standard SQLSTATEs.
pub(crate) fn reclassify_vendor(
    dict: &DBDictionary,
    mut err: StoreError,
    vendor: &[(i32, IntegrityViolation)],
) -> StoreError {
    if matches!(err.kind, StoreErrorKind::ReferentialIntegrity(_)) {
        if let Some((_, violation)) = vendor.iter().find(|(code, _)| err.has_vendor_code(*code)) {
            err.kind = StoreErrorKind::ReferentialIntegrity(*violation);
            return err;
        }
    }
    reclassify(dict, err)
}

pub(crate) fn native_join(
    dict: &DBDictionary,
    join: &Join,
    from: &mut SqlBuffer,
    _conditions: &mut Vec<SqlBuffer>,
) -> Result<()> {
    dict.append_sql92_join(join, from);
    Ok(())
}
