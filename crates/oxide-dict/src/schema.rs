//! Table and column metadata consumed by the dictionaries.
//!
//! The mapping layer that produces these values lives outside this crate;
//! here they are plain data. Everything is serde-enabled so schemas can be
//! loaded from JSON (see the `oxide-dict` CLI).

use serde::{Deserialize, Serialize};

/// Logical column types, one per JDBC type code the dictionaries care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Date,
    Time,
    Timestamp,
    Binary,
    Varbinary,
    LongVarbinary,
    Blob,
    Other,
    Null,
}

impl ColumnType {
    /// Maps a `java.sql.Types`-style code to a logical type. National
    /// character variants collapse onto their plain counterparts.
    #[must_use]
    pub const fn from_jdbc_code(code: i32) -> Self {
        match code {
            -7 => Self::Bit,
            16 => Self::Boolean,
            -6 => Self::TinyInt,
            5 => Self::SmallInt,
            4 => Self::Integer,
            -5 => Self::BigInt,
            7 => Self::Real,
            6 => Self::Float,
            8 => Self::Double,
            2 => Self::Numeric,
            3 => Self::Decimal,
            1 | -15 => Self::Char,
            12 | -9 => Self::Varchar,
            -1 | -16 => Self::LongVarchar,
            2005 | 2011 => Self::Clob,
            91 => Self::Date,
            92 | 2013 => Self::Time,
            93 | 2014 => Self::Timestamp,
            -2 => Self::Binary,
            -3 => Self::Varbinary,
            -4 => Self::LongVarbinary,
            2004 => Self::Blob,
            0 => Self::Null,
            _ => Self::Other,
        }
    }

    /// Returns the `java.sql.Types`-style code of this type.
    #[must_use]
    pub const fn jdbc_code(self) -> i32 {
        match self {
            Self::Bit => -7,
            Self::Boolean => 16,
            Self::TinyInt => -6,
            Self::SmallInt => 5,
            Self::Integer => 4,
            Self::BigInt => -5,
            Self::Real => 7,
            Self::Float => 6,
            Self::Double => 8,
            Self::Numeric => 2,
            Self::Decimal => 3,
            Self::Char => 1,
            Self::Varchar => 12,
            Self::LongVarchar => -1,
            Self::Clob => 2005,
            Self::Date => 91,
            Self::Time => 92,
            Self::Timestamp => 93,
            Self::Binary => -2,
            Self::Varbinary => -3,
            Self::LongVarbinary => -4,
            Self::Blob => 2004,
            Self::Other => 1111,
            Self::Null => 0,
        }
    }

    /// Boolean-like types (`BIT` and `BOOLEAN`).
    #[must_use]
    pub const fn is_boolean(self) -> bool {
        matches!(self, Self::Bit | Self::Boolean)
    }

    /// Approximate numeric types.
    #[must_use]
    pub const fn is_floating(self) -> bool {
        matches!(self, Self::Real | Self::Float | Self::Double)
    }

    /// Character types, including character LOBs.
    #[must_use]
    pub const fn is_character(self) -> bool {
        matches!(
            self,
            Self::Char | Self::Varchar | Self::LongVarchar | Self::Clob
        )
    }

    /// Types whose DDL name carries a length, e.g. `VARCHAR(255)`.
    #[must_use]
    pub const fn is_sized(self) -> bool {
        matches!(
            self,
            Self::Char | Self::Varchar | Self::Binary | Self::Varbinary
        )
    }
}

/// A column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Declared type name; overrides the dictionary's type table.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub decimal_digits: Option<u32>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Value is assigned by the database on insert.
    #[serde(default)]
    pub auto_assigned: bool,
    /// Default value as a SQL literal.
    #[serde(default)]
    pub default: Option<String>,
}

const fn default_nullable() -> bool {
    true
}

impl Column {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            type_name: None,
            size: None,
            decimal_digits: None,
            nullable: true,
            auto_assigned: false,
            default: None,
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub const fn with_scale(mut self, digits: u32) -> Self {
        self.decimal_digits = Some(digits);
        self
    }

    #[must_use]
    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as database-assigned (identity / auto increment).
    #[must_use]
    pub const fn auto_assign(mut self) -> Self {
        self.auto_assigned = true;
        self.nullable = false;
        self
    }
}

/// Primary key of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

impl PrimaryKey {
    #[must_use]
    pub fn new(name: Option<&str>, columns: &[&str]) -> Self {
        Self {
            name: name.map(String::from),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
        }
    }
}

/// Referential action for a foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action clause is emitted.
    #[default]
    None,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL keyword, `None` when no clause is emitted.
    #[must_use]
    pub const fn as_sql(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Restrict => Some("RESTRICT"),
            Self::Cascade => Some("CASCADE"),
            Self::SetNull => Some("SET NULL"),
            Self::SetDefault => Some("SET DEFAULT"),
        }
    }
}

/// A foreign key from `columns` of the owning table to
/// `referenced_columns` of `referenced_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    #[serde(default)]
    pub on_update: ForeignKeyAction,
    #[serde(default)]
    pub deferred: bool,
}

impl ForeignKey {
    #[must_use]
    pub fn new(
        name: Option<&str>,
        columns: &[&str],
        referenced_table: &str,
        referenced_columns: &[&str],
    ) -> Self {
        Self {
            name: name.map(String::from),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            referenced_table: String::from(referenced_table),
            referenced_columns: referenced_columns.iter().map(|c| String::from(*c)).collect(),
            on_delete: ForeignKeyAction::None,
            on_update: ForeignKeyAction::None,
            deferred: false,
        }
    }

    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    /// Column pairs `(local, referenced)`.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.referenced_columns.iter().map(String::as_str))
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: vec![],
            primary_key: None,
            foreign_keys: vec![],
        }
    }

    #[must_use]
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn primary_key(mut self, pk: PrimaryKey) -> Self {
        self.primary_key = Some(pk);
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Looks a column up by name (case-insensitive, like most databases).
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Whether any column is assigned by the database on insert.
    #[must_use]
    pub fn has_auto_assigned_columns(&self) -> bool {
        self.columns.iter().any(|c| c.auto_assigned)
    }

    /// `schema.name`, or just `name` without a schema.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{s}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// One row of driver column metadata, as reported (possibly wrongly) by the
/// driver. Dictionaries normalise these before turning them into [`Column`]s.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMetadata {
    pub table_catalog: Option<String>,
    pub table_schema: Option<String>,
    pub table_name: String,
    pub column_name: String,
    /// `java.sql.Types`-style code.
    pub data_type: i32,
    pub type_name: String,
    pub column_size: Option<u32>,
    pub decimal_digits: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jdbc_codes_map_both_ways() {
        for ty in [
            ColumnType::Bit,
            ColumnType::Integer,
            ColumnType::Varchar,
            ColumnType::Clob,
            ColumnType::Timestamp,
            ColumnType::Blob,
        ] {
            assert_eq!(ColumnType::from_jdbc_code(ty.jdbc_code()), ty);
        }
        // NVARCHAR collapses onto VARCHAR
        assert_eq!(ColumnType::from_jdbc_code(-9), ColumnType::Varchar);
        assert_eq!(ColumnType::from_jdbc_code(-155), ColumnType::Other);
    }

    #[test]
    fn test_table_lookup_and_full_name() {
        let table = Table::new("ORDERS")
            .in_schema("SALES")
            .column(Column::new("ID", ColumnType::BigInt).auto_assign())
            .column(Column::new("NOTE", ColumnType::Varchar).with_size(80));
        assert_eq!(table.full_name(), "SALES.ORDERS");
        assert!(table.find_column("note").is_some());
        assert!(table.has_auto_assigned_columns());
        assert!(!table.find_column("ID").unwrap().nullable);
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"{
            "name": "BOOK",
            "columns": [
                {"name": "ID", "type": "integer", "nullable": false},
                {"name": "TITLE", "type": "varchar", "size": 120}
            ],
            "primary_key": {"columns": ["ID"]},
            "foreign_keys": [{
                "columns": ["AUTHOR_ID"],
                "referenced_table": "AUTHOR",
                "referenced_columns": ["ID"],
                "on_delete": "cascade"
            }]
        }"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns[1].nullable);
        assert_eq!(table.foreign_keys[0].on_delete, ForeignKeyAction::Cascade);
    }
}
