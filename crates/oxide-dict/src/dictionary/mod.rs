//! Per-database dictionaries.
//!
//! A [`DBDictionary`] is one record of data (platform name, capability
//! flags, type names, reserved words, identifier limits, error codes) plus a
//! [`Generators`] table of plain function pointers that produce the SQL
//! fragments. Every dialect starts from [`DBDictionary::base`] and replaces
//! only the fields and generators whose ANSI-ish default is wrong for it.
//!
//! Dictionaries are immutable once built, apart from the state detected on
//! the first connection ([`DBDictionary::connected_configuration`]), which is
//! published once through a [`OnceLock`].

mod access;
mod base;
mod config;
mod db2;
mod derby;
mod factory;
mod firebird;
mod h2;
mod herddb;
mod hsql;
mod informix;
mod mysql;
mod soliddb;
mod sqlserver;

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, LazyLock, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use config::DictionaryConfig;
pub use factory::DictionaryFactory;

use crate::boolean::{BooleanRepresentation, NativeBoolean};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::driver::DriverMetadata;
use crate::error::{Error, Result};
use crate::exceptions::{ErrorCodes, SqlError, StoreError};
use crate::join::{Join, JoinSyntax, JoinType};
use crate::schema::{
    Column, ColumnMetadata, ColumnType, ForeignKey, ForeignKeyAction, PrimaryKey, Table,
};
use crate::value::SqlValue;

/// Range end meaning "no upper bound".
pub const UNBOUNDED: u64 = u64::MAX;

/// Where the pagination clause goes in a SELECT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePosition {
    /// After ORDER BY: `... LIMIT 10`.
    #[default]
    PostSelect,
    /// Right after SELECT, before DISTINCT: `SELECT FIRST 10 DISTINCT ...`.
    PreDistinct,
    /// After DISTINCT: `SELECT DISTINCT TOP 10 ...`.
    PostDistinct,
    /// After the locking clause: `... FOR UPDATE LIMIT 10`.
    PostLock,
}

/// Where constraint names go in a constraint clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConstraintNameMode {
    /// `CONSTRAINT name PRIMARY KEY (...)`.
    #[default]
    Before,
    /// `PRIMARY KEY (...) CONSTRAINT name`.
    After,
    /// Names are dropped.
    Omit,
}

/// Capability flags. Connection detection may adjust a copy of these.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub supports_subselect: bool,
    pub supports_correlated_subselect: bool,
    pub requires_alias_for_subselect: bool,
    pub supports_select_start_index: bool,
    pub supports_select_end_index: bool,
    pub range_position: RangePosition,
    pub supports_select_for_update: bool,
    pub supports_lock_with_distinct: bool,
    pub supports_lock_with_outer_join: bool,
    pub supports_lock_with_multiple_tables: bool,
    pub supports_lock_with_order_by: bool,
    pub supports_lock_with_select_range: bool,
    pub supports_query_timeout: bool,
    pub supports_scrollable_result_sets: bool,
    pub supports_multiple_nontransactional_result_sets: bool,
    pub supports_union: bool,
    pub supports_having: bool,
    pub supports_index_of: bool,
    pub supports_foreign_keys: bool,
    pub supports_deferred_constraints: bool,
    pub supports_unique_constraints: bool,
    pub supports_null_unique_columns: bool,
    pub supports_alter_primary_key: bool,
    pub supports_restrict_delete_action: bool,
    pub supports_cascade_delete_action: bool,
    pub supports_null_delete_action: bool,
    pub supports_default_delete_action: bool,
    pub supports_restrict_update_action: bool,
    pub supports_cascade_update_action: bool,
    pub supports_null_update_action: bool,
    pub supports_default_update_action: bool,
    pub supports_auto_assign: bool,
    pub supports_alter_table_with_add_column: bool,
    pub supports_alter_table_with_drop_column: bool,
    pub supports_timestamp_nanos: bool,
    pub use_schema_name: bool,
    pub store_large_numbers_as_strings: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_subselect: true,
            supports_correlated_subselect: true,
            requires_alias_for_subselect: false,
            supports_select_start_index: true,
            supports_select_end_index: true,
            range_position: RangePosition::PostSelect,
            supports_select_for_update: true,
            supports_lock_with_distinct: true,
            supports_lock_with_outer_join: true,
            supports_lock_with_multiple_tables: true,
            supports_lock_with_order_by: true,
            supports_lock_with_select_range: true,
            supports_query_timeout: true,
            supports_scrollable_result_sets: true,
            supports_multiple_nontransactional_result_sets: true,
            supports_union: true,
            supports_having: true,
            supports_index_of: true,
            supports_foreign_keys: true,
            supports_deferred_constraints: false,
            supports_unique_constraints: true,
            supports_null_unique_columns: true,
            supports_alter_primary_key: true,
            supports_restrict_delete_action: true,
            supports_cascade_delete_action: true,
            supports_null_delete_action: true,
            supports_default_delete_action: true,
            supports_restrict_update_action: true,
            supports_cascade_update_action: false,
            supports_null_update_action: false,
            supports_default_update_action: false,
            supports_auto_assign: true,
            supports_alter_table_with_add_column: true,
            supports_alter_table_with_drop_column: true,
            supports_timestamp_nanos: true,
            use_schema_name: true,
            store_large_numbers_as_strings: false,
        }
    }
}

/// Type names per logical type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNames {
    pub bit: String,
    pub boolean: String,
    pub tinyint: String,
    pub smallint: String,
    pub integer: String,
    pub bigint: String,
    pub real: String,
    pub float: String,
    pub double: String,
    pub numeric: String,
    pub decimal: String,
    pub char: String,
    pub varchar: String,
    pub longvarchar: String,
    pub clob: String,
    pub date: String,
    pub time: String,
    pub timestamp: String,
    pub binary: String,
    pub varbinary: String,
    pub longvarbinary: String,
    pub blob: String,
    pub other: String,
    /// Length used for sized types declared without one.
    pub default_size: u32,
}

impl Default for TypeNames {
    fn default() -> Self {
        Self {
            bit: String::from("BIT"),
            boolean: String::from("BOOLEAN"),
            tinyint: String::from("TINYINT"),
            smallint: String::from("SMALLINT"),
            integer: String::from("INTEGER"),
            bigint: String::from("BIGINT"),
            real: String::from("REAL"),
            float: String::from("FLOAT"),
            double: String::from("DOUBLE"),
            numeric: String::from("NUMERIC"),
            decimal: String::from("DECIMAL"),
            char: String::from("CHAR"),
            varchar: String::from("VARCHAR"),
            longvarchar: String::from("LONGVARCHAR"),
            clob: String::from("CLOB"),
            date: String::from("DATE"),
            time: String::from("TIME"),
            timestamp: String::from("TIMESTAMP"),
            binary: String::from("BINARY"),
            varbinary: String::from("VARBINARY"),
            longvarbinary: String::from("LONGVARBINARY"),
            blob: String::from("BLOB"),
            other: String::from("OTHER"),
            default_size: 255,
        }
    }
}

impl TypeNames {
    /// The name declared for `ty`.
    #[must_use]
    pub fn for_type(&self, ty: ColumnType) -> &str {
        match ty {
            ColumnType::Bit => &self.bit,
            ColumnType::Boolean => &self.boolean,
            ColumnType::TinyInt => &self.tinyint,
            ColumnType::SmallInt => &self.smallint,
            ColumnType::Integer => &self.integer,
            ColumnType::BigInt => &self.bigint,
            ColumnType::Real => &self.real,
            ColumnType::Float => &self.float,
            ColumnType::Double => &self.double,
            ColumnType::Numeric => &self.numeric,
            ColumnType::Decimal => &self.decimal,
            ColumnType::Char => &self.char,
            ColumnType::Varchar => &self.varchar,
            ColumnType::LongVarchar => &self.longvarchar,
            ColumnType::Clob => &self.clob,
            ColumnType::Date => &self.date,
            ColumnType::Time => &self.time,
            ColumnType::Timestamp => &self.timestamp,
            ColumnType::Binary => &self.binary,
            ColumnType::Varbinary => &self.varbinary,
            ColumnType::LongVarbinary => &self.longvarbinary,
            ColumnType::Blob => &self.blob,
            ColumnType::Other | ColumnType::Null => &self.other,
        }
    }
}

/// Identifier length limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameLimits {
    pub max_table_name_length: usize,
    pub max_column_name_length: usize,
    pub max_constraint_name_length: usize,
    pub max_index_name_length: usize,
}

impl Default for NameLimits {
    fn default() -> Self {
        Self::uniform(128)
    }
}

impl NameLimits {
    /// The same limit for every kind of identifier.
    #[must_use]
    pub const fn uniform(max: usize) -> Self {
        Self {
            max_table_name_length: max,
            max_column_name_length: max,
            max_constraint_name_length: max,
            max_index_name_length: max,
        }
    }
}

/// Input of the pagination generator. `end` is exclusive; [`UNBOUNDED`]
/// means no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeContext {
    pub start: u64,
    pub end: u64,
    /// The select is nested in another statement.
    pub subselect: bool,
    /// The select has an ORDER BY clause.
    pub has_order_by: bool,
}

impl RangeContext {
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            subselect: false,
            has_order_by: false,
        }
    }

    /// `(0, UNBOUNDED)`: no pagination at all.
    #[must_use]
    pub const fn is_unbounded_window(&self) -> bool {
        self.start == 0 && self.end == UNBOUNDED
    }

    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.end != UNBOUNDED
    }

    /// Number of rows in the window; only meaningful when bounded.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

pub type SubstringFn = fn(&DBDictionary, &mut SqlBuffer, &FilterValue, &FilterValue, Option<&FilterValue>);
pub type IndexOfFn =
    fn(&DBDictionary, &mut SqlBuffer, &FilterValue, &FilterValue, Option<&FilterValue>) -> Result<()>;
pub type SelectRangeFn = fn(&DBDictionary, &mut SqlBuffer, &RangeContext);
pub type CreateTableFn = fn(&DBDictionary, &Table) -> Vec<String>;
pub type PrimaryKeyFn = fn(&DBDictionary, &Table, &PrimaryKey) -> Vec<String>;
pub type ForeignKeyFn = fn(&DBDictionary, &Table, &ForeignKey) -> Vec<String>;
pub type NormalizeMetadataFn = fn(&DBDictionary, ColumnMetadata) -> ColumnMetadata;
pub type JdbcTypeFn = fn(&DBDictionary, i32, &str, Option<u32>) -> ColumnType;
pub type PreferredTypeFn = fn(&DBDictionary, ColumnType) -> ColumnType;
pub type TypeNameFn = fn(&DBDictionary, &Column) -> String;
pub type ReadValueFn = fn(&DBDictionary, SqlValue, &Column) -> Result<SqlValue>;
pub type SetLongFn = fn(&DBDictionary, i64, Option<&Column>) -> SqlValue;
pub type SetBigDecimalFn = fn(&DBDictionary, &str, Option<&Column>) -> Result<SqlValue>;
pub type SetBooleanFn = fn(&DBDictionary, bool, Option<&Column>) -> SqlValue;
pub type ConnectedFn = fn(&DBDictionary, &DriverMetadata, (u32, u32), &mut Capabilities);
pub type ReclassifyFn = fn(&DBDictionary, StoreError) -> StoreError;
pub type NativeJoinFn = fn(&DBDictionary, &Join, &mut SqlBuffer, &mut Vec<SqlBuffer>) -> Result<()>;

/// The overridable fragment generators of a dictionary.
#[derive(Debug, Clone, Copy)]
pub struct Generators {
    pub substring: SubstringFn,
    pub index_of: IndexOfFn,
    pub select_range: SelectRangeFn,
    pub create_table: CreateTableFn,
    pub add_primary_key: PrimaryKeyFn,
    pub drop_primary_key: PrimaryKeyFn,
    pub add_foreign_key: ForeignKeyFn,
    pub normalize_metadata: NormalizeMetadataFn,
    pub jdbc_type: JdbcTypeFn,
    pub preferred_type: PreferredTypeFn,
    pub type_name: TypeNameFn,
    pub read_value: ReadValueFn,
    pub set_long: SetLongFn,
    pub set_big_decimal: SetBigDecimalFn,
    pub set_boolean: SetBooleanFn,
    pub connected_configuration: ConnectedFn,
    pub reclassify: ReclassifyFn,
    pub native_join: NativeJoinFn,
}

impl Default for Generators {
    fn default() -> Self {
        Self {
            substring: base::substring,
            index_of: base::index_of,
            select_range: base::select_range,
            create_table: base::create_table,
            add_primary_key: base::add_primary_key,
            drop_primary_key: base::drop_primary_key,
            add_foreign_key: base::add_foreign_key,
            normalize_metadata: base::normalize_metadata,
            jdbc_type: base::jdbc_type,
            preferred_type: base::preferred_type,
            type_name: base::type_name,
            read_value: base::read_value,
            set_long: base::set_long,
            set_big_decimal: base::set_big_decimal,
            set_boolean: base::set_boolean,
            connected_configuration: base::connected_configuration,
            reclassify: base::reclassify,
            native_join: base::native_join,
        }
    }
}

/// What the first connection revealed about the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedState {
    pub product: String,
    pub driver: String,
    pub version: (u32, u32),
    pub capabilities: Capabilities,
}

/// SQL-92 reserved words shared by every dialect.
const SQL92_RESERVED: &[&str] = &[
    "ABSOLUTE", "ACTION", "ADD", "ALL", "ALLOCATE", "ALTER", "AND", "ANY", "ARE", "AS", "ASC",
    "ASSERTION", "AT", "AUTHORIZATION", "AVG", "BEGIN", "BETWEEN", "BIT", "BOTH", "BY",
    "CASCADE", "CASCADED", "CASE", "CAST", "CATALOG", "CHAR", "CHARACTER", "CHECK", "CLOSE",
    "COLLATE", "COLUMN", "COMMIT", "CONNECT", "CONNECTION", "CONSTRAINT", "CONTINUE",
    "CONVERT", "COUNT", "CREATE", "CROSS", "CURRENT", "CURSOR", "DATE", "DAY", "DEALLOCATE",
    "DEC", "DECIMAL", "DECLARE", "DEFAULT", "DELETE", "DESC", "DESCRIBE", "DISTINCT", "DOUBLE",
    "DROP", "ELSE", "END", "ESCAPE", "EXCEPT", "EXEC", "EXECUTE", "EXISTS", "FALSE", "FETCH",
    "FIRST", "FLOAT", "FOR", "FOREIGN", "FROM", "FULL", "GET", "GLOBAL", "GRANT", "GROUP",
    "HAVING", "HOUR", "IDENTITY", "IN", "INNER", "INSERT", "INT", "INTEGER", "INTERSECT",
    "INTERVAL", "INTO", "IS", "JOIN", "KEY", "LAST", "LEFT", "LIKE", "LOCAL", "LOWER", "MATCH",
    "MAX", "MIN", "MINUTE", "MONTH", "NATURAL", "NOT", "NULL", "NUMERIC", "OF", "ON", "ONLY",
    "OPEN", "OPTION", "OR", "ORDER", "OUTER", "POSITION", "PRIMARY", "PRIVILEGES", "PROCEDURE",
    "PUBLIC", "REAL", "REFERENCES", "RESTRICT", "REVOKE", "RIGHT", "ROLLBACK", "ROWS",
    "SCHEMA", "SECOND", "SELECT", "SESSION", "SET", "SIZE", "SMALLINT", "SOME", "SUBSTRING",
    "SUM", "TABLE", "THEN", "TIME", "TIMESTAMP", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE",
    "UPPER", "USER", "USING", "VALUE", "VALUES", "VARCHAR", "VIEW", "WHEN", "WHERE", "WITH",
    "YEAR",
];

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)").expect("version pattern is valid"));

/// A per-database SQL strategy.
#[derive(Debug)]
pub struct DBDictionary {
    pub platform: String,
    pub capabilities: Capabilities,
    pub types: TypeNames,
    /// Upper-case reserved words.
    pub reserved_words: BTreeSet<String>,
    pub limits: NameLimits,
    pub boolean_representation: Arc<dyn BooleanRepresentation>,
    pub error_codes: ErrorCodes,
    pub leading_delimiter: String,
    pub trailing_delimiter: String,
    pub constraint_name_mode: ConstraintNameMode,
    /// Appended after the statement, e.g. `FOR UPDATE`.
    pub for_update_clause: Option<String>,
    /// Appended after each table of the FROM clause, e.g. `WITH (UPDLOCK)`.
    pub table_for_update_clause: Option<String>,
    pub auto_assign_clause: Option<String>,
    /// Type replacing the declared one for auto-assigned columns.
    pub auto_assign_type_name: Option<String>,
    /// Storage engine appended to CREATE TABLE.
    pub table_type: Option<String>,
    pub default_join_syntax: JoinSyntax,
    /// Fetch size requested for large results.
    pub large_fetch_size: Option<u32>,
    pub generators: Generators,
    connected: OnceLock<ConnectedState>,
}

impl DBDictionary {
    /// The ANSI-ish defaults every dialect starts from.
    #[must_use]
    pub fn base() -> Self {
        Self {
            platform: String::from("Generic"),
            capabilities: Capabilities::default(),
            types: TypeNames::default(),
            reserved_words: SQL92_RESERVED.iter().map(|w| String::from(*w)).collect(),
            limits: NameLimits::default(),
            boolean_representation: Arc::new(NativeBoolean),
            error_codes: ErrorCodes::standard(),
            leading_delimiter: String::from("\""),
            trailing_delimiter: String::from("\""),
            constraint_name_mode: ConstraintNameMode::Before,
            for_update_clause: Some(String::from("FOR UPDATE")),
            table_for_update_clause: None,
            auto_assign_clause: None,
            auto_assign_type_name: None,
            table_type: None,
            default_join_syntax: JoinSyntax::Sql92,
            large_fetch_size: None,
            generators: Generators::default(),
            connected: OnceLock::new(),
        }
    }

    /// Adds reserved words (upper-cased) to the base set.
    pub fn add_reserved_words(&mut self, words: &[&str]) {
        self.reserved_words
            .extend(words.iter().map(|w| w.to_ascii_uppercase()));
    }

    // ---------------------------------------------------------------------
    // Connection-derived state
    // ---------------------------------------------------------------------

    /// Effective capabilities: the detected ones once connected.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        self.connected
            .get()
            .map_or(&self.capabilities, |state| &state.capabilities)
    }

    #[must_use]
    pub fn connected(&self) -> Option<&ConnectedState> {
        self.connected.get()
    }

    /// Server `(major, minor)` version, once connected.
    #[must_use]
    pub fn server_version(&self) -> Option<(u32, u32)> {
        self.connected.get().map(|state| state.version)
    }

    /// Detects driver and server on the first connection and adjusts the
    /// capabilities. Later calls return the published state; concurrent
    /// first calls derive the same state from the same metadata.
    pub fn connected_configuration(&self, meta: &DriverMetadata) -> &ConnectedState {
        let state = self.connected.get_or_init(|| {
            let version = detect_version(meta);
            let mut capabilities = self.capabilities.clone();
            (self.generators.connected_configuration)(self, meta, version, &mut capabilities);
            info!(
                platform = %self.platform,
                product = %meta.database_product_name,
                version = ?version,
                driver = %meta.driver_name,
                "detected database"
            );
            ConnectedState {
                product: meta.database_product_name.clone(),
                driver: meta.driver_name.clone(),
                version,
                capabilities,
            }
        });
        if state.driver != meta.driver_name {
            debug!(
                configured = %state.driver,
                seen = %meta.driver_name,
                "dictionary already configured by another driver"
            );
        }
        state
    }

    // ---------------------------------------------------------------------
    // Fragment generators
    // ---------------------------------------------------------------------

    /// Appends a substring of `source` from the 0-based `start` up to the
    /// exclusive `end`, or to the end of the string.
    pub fn substring(
        &self,
        buf: &mut SqlBuffer,
        source: &FilterValue,
        start: &FilterValue,
        end: Option<&FilterValue>,
    ) {
        (self.generators.substring)(self, buf, source, start, end);
    }

    /// Appends a 0-based position of `needle` in `haystack`, searching from
    /// the 0-based `from` if given.
    pub fn index_of(
        &self,
        buf: &mut SqlBuffer,
        haystack: &FilterValue,
        needle: &FilterValue,
        from: Option<&FilterValue>,
    ) -> Result<()> {
        (self.generators.index_of)(self, buf, haystack, needle, from)
    }

    /// Appends the pagination clause. `(0, UNBOUNDED)` appends nothing.
    pub fn append_select_range(&self, buf: &mut SqlBuffer, ctx: &RangeContext) {
        if ctx.is_unbounded_window() {
            return;
        }
        (self.generators.select_range)(self, buf, ctx);
    }

    #[must_use]
    pub fn create_table_sql(&self, table: &Table) -> Vec<String> {
        (self.generators.create_table)(self, table)
    }

    /// Empty when the dialect cannot alter primary keys after creation.
    #[must_use]
    pub fn add_primary_key_sql(&self, table: &Table, pk: &PrimaryKey) -> Vec<String> {
        (self.generators.add_primary_key)(self, table, pk)
    }

    #[must_use]
    pub fn drop_primary_key_sql(&self, table: &Table, pk: &PrimaryKey) -> Vec<String> {
        (self.generators.drop_primary_key)(self, table, pk)
    }

    /// Empty when the dialect has no foreign keys, or cannot express the
    /// key's referential actions.
    #[must_use]
    pub fn add_foreign_key_sql(&self, table: &Table, fk: &ForeignKey) -> Vec<String> {
        (self.generators.add_foreign_key)(self, table, fk)
    }

    #[must_use]
    pub fn drop_table_sql(&self, table: &Table) -> Vec<String> {
        vec![format!("DROP TABLE {}", self.full_table_name(table))]
    }

    /// `name type [DEFAULT x] [auto-assign] [NOT NULL]`.
    #[must_use]
    pub fn column_declaration(&self, col: &Column) -> String {
        let mut sql = format!("{} {}", self.to_db_name(&col.name), self.type_name(col));
        if let Some(default) = &col.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if col.auto_assigned && self.capabilities().supports_auto_assign {
            if let Some(clause) = &self.auto_assign_clause {
                sql.push(' ');
                sql.push_str(clause);
            }
        }
        if !col.nullable {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    /// `PRIMARY KEY (cols)` with the name placed per
    /// [`ConstraintNameMode`].
    #[must_use]
    pub fn primary_key_constraint(&self, pk: &PrimaryKey) -> String {
        let body = format!("PRIMARY KEY ({})", self.column_list(&pk.columns));
        self.name_constraint(pk.name.as_deref(), body)
    }

    /// `FOREIGN KEY (cols) REFERENCES t (cols) [actions]`, or `None` when an
    /// action is not supported.
    #[must_use]
    pub fn foreign_key_constraint(&self, fk: &ForeignKey) -> Option<String> {
        let caps = self.capabilities();
        let delete_ok = match fk.on_delete {
            ForeignKeyAction::None => true,
            ForeignKeyAction::Restrict => caps.supports_restrict_delete_action,
            ForeignKeyAction::Cascade => caps.supports_cascade_delete_action,
            ForeignKeyAction::SetNull => caps.supports_null_delete_action,
            ForeignKeyAction::SetDefault => caps.supports_default_delete_action,
        };
        let update_ok = match fk.on_update {
            ForeignKeyAction::None => true,
            ForeignKeyAction::Restrict => caps.supports_restrict_update_action,
            ForeignKeyAction::Cascade => caps.supports_cascade_update_action,
            ForeignKeyAction::SetNull => caps.supports_null_update_action,
            ForeignKeyAction::SetDefault => caps.supports_default_update_action,
        };
        if !delete_ok || !update_ok {
            debug!(
                platform = %self.platform,
                on_delete = ?fk.on_delete,
                on_update = ?fk.on_update,
                "skipping foreign key with unsupported action"
            );
            return None;
        }

        let mut body = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column_list(&fk.columns),
            self.to_db_name(&fk.referenced_table),
            self.column_list(&fk.referenced_columns)
        );
        if let Some(action) = fk.on_delete.as_sql() {
            body.push_str(" ON DELETE ");
            body.push_str(action);
        }
        if let Some(action) = fk.on_update.as_sql() {
            body.push_str(" ON UPDATE ");
            body.push_str(action);
        }
        if fk.deferred && caps.supports_deferred_constraints {
            body.push_str(" INITIALLY DEFERRED");
        }
        Some(self.name_constraint(fk.name.as_deref(), body))
    }

    fn name_constraint(&self, name: Option<&str>, body: String) -> String {
        match (name, self.constraint_name_mode) {
            (Some(n), ConstraintNameMode::Before) => {
                format!("CONSTRAINT {} {body}", self.to_db_name(n))
            }
            (Some(n), ConstraintNameMode::After) => {
                format!("{body} CONSTRAINT {}", self.to_db_name(n))
            }
            _ => body,
        }
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.to_db_name(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ---------------------------------------------------------------------
    // Joins
    // ---------------------------------------------------------------------

    /// Appends the second table of `join` to a FROM clause that already
    /// contains the first. Conditions that belong in WHERE (traditional
    /// syntax) are pushed to `conditions`.
    pub fn append_join(
        &self,
        join: &Join,
        syntax: JoinSyntax,
        from: &mut SqlBuffer,
        conditions: &mut Vec<SqlBuffer>,
    ) -> Result<()> {
        match syntax {
            JoinSyntax::Sql92 => {
                self.append_sql92_join(join, from);
                Ok(())
            }
            JoinSyntax::Traditional => self.append_traditional_join(join, from, conditions),
            JoinSyntax::Database => (self.generators.native_join)(self, join, from, conditions),
        }
    }

    /// `INNER JOIN t t1 ON (...)`, `LEFT OUTER JOIN ...` or `CROSS JOIN`.
    pub fn append_sql92_join(&self, join: &Join, from: &mut SqlBuffer) {
        let keyword = match join.join_type() {
            JoinType::Inner => " INNER JOIN ",
            JoinType::Outer => " LEFT OUTER JOIN ",
            JoinType::Cross => " CROSS JOIN ",
        };
        let second = join.second();
        from.append(keyword).append(format!(
            "{} {}",
            self.full_table_name(&second.table),
            second.alias
        ));
        if join.join_type() != JoinType::Cross {
            from.append(" ON ");
            join.append_condition(from);
        }
    }

    /// `, t t1` with the condition moved to WHERE. Outer joins have no
    /// traditional form.
    pub fn append_traditional_join(
        &self,
        join: &Join,
        from: &mut SqlBuffer,
        conditions: &mut Vec<SqlBuffer>,
    ) -> Result<()> {
        if join.join_type() == JoinType::Outer {
            return Err(Error::unsupported(
                &self.platform,
                "outer join with traditional join syntax",
            ));
        }
        let second = join.second();
        from.append(format!(
            ", {} {}",
            self.full_table_name(&second.table),
            second.alias
        ));
        if join.join_type() != JoinType::Cross {
            let mut condition = SqlBuffer::new();
            join.append_condition(&mut condition);
            conditions.push(condition);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Metadata and types
    // ---------------------------------------------------------------------

    /// Normalises raw driver metadata, keeps the columns of the requested
    /// schema and table (case-insensitive), and converts them.
    #[must_use]
    pub fn get_columns(
        &self,
        raw: Vec<ColumnMetadata>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Vec<Column> {
        raw.into_iter()
            .map(|meta| (self.generators.normalize_metadata)(self, meta))
            .filter(|meta| match schema {
                Some(s) => meta
                    .table_schema
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case(s)),
                None => true,
            })
            .filter(|meta| table.is_none_or(|t| meta.table_name.eq_ignore_ascii_case(t)))
            .map(|meta| self.new_column(&meta))
            .collect()
    }

    /// Builds a column from (normalised) metadata.
    #[must_use]
    pub fn new_column(&self, meta: &ColumnMetadata) -> Column {
        let column_type = self.jdbc_type(meta.data_type, &meta.type_name, meta.column_size);
        Column {
            name: meta.column_name.clone(),
            column_type,
            type_name: (!meta.type_name.is_empty()).then(|| meta.type_name.clone()),
            size: meta.column_size,
            decimal_digits: meta.decimal_digits,
            nullable: meta.nullable,
            auto_assigned: meta.auto_increment,
            default: meta.default.clone(),
        }
    }

    /// Logical type for a reported type code and name.
    #[must_use]
    pub fn jdbc_type(&self, code: i32, type_name: &str, size: Option<u32>) -> ColumnType {
        (self.generators.jdbc_type)(self, code, type_name, size)
    }

    /// Type the dialect stores `ty` as.
    #[must_use]
    pub fn preferred_type(&self, ty: ColumnType) -> ColumnType {
        (self.generators.preferred_type)(self, ty)
    }

    /// DDL type of `col`, size included.
    #[must_use]
    pub fn type_name(&self, col: &Column) -> String {
        (self.generators.type_name)(self, col)
    }

    /// Converts a value read from `col` into its normalised form.
    pub fn read_value(&self, raw: SqlValue, col: &Column) -> Result<SqlValue> {
        (self.generators.read_value)(self, raw, col)
    }

    // ---------------------------------------------------------------------
    // Binding
    // ---------------------------------------------------------------------

    /// Converts `value` into what the driver should receive for `column`.
    pub fn bind_value(&self, value: SqlValue, column: Option<&Column>) -> Result<SqlValue> {
        match value {
            SqlValue::Int(n) => Ok((self.generators.set_long)(self, n, column)),
            SqlValue::Decimal(d) => (self.generators.set_big_decimal)(self, &d, column),
            SqlValue::Bool(b) => Ok((self.generators.set_boolean)(self, b, column)),
            other => Ok(other),
        }
    }

    /// Current parameter values of `buf`, converted for binding. The
    /// calling thread's bindings are consumed: a later execution on this
    /// thread sees the defaults unless it binds again.
    pub fn bind_parameters(&self, buf: &SqlBuffer) -> Result<Vec<SqlValue>> {
        let values = self.parameter_values(buf);
        buf.clear_bindings();
        values
    }

    /// Like [`bind_parameters`](Self::bind_parameters), leaving the
    /// bindings in place.
    pub fn parameter_values(&self, buf: &SqlBuffer) -> Result<Vec<SqlValue>> {
        buf.placeholders()
            .map(|p| self.bind_value(p.value(), p.column().map(AsRef::as_ref)))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Errors
    // ---------------------------------------------------------------------

    /// Classifies a native chain into a store error.
    #[must_use]
    pub fn new_store_exception(
        &self,
        message: String,
        chain: Vec<Arc<SqlError>>,
        failed: Option<String>,
    ) -> StoreError {
        let kind = self.error_codes.classify(&chain);
        let err = StoreError {
            kind,
            message,
            chain,
            failed,
        };
        (self.generators.reclassify)(self, err)
    }

    // ---------------------------------------------------------------------
    // Identifiers
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_words.contains(&name.to_ascii_uppercase())
    }

    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        format!("{}{name}{}", self.leading_delimiter, self.trailing_delimiter)
    }

    /// Quotes `name` only when it is a reserved word.
    #[must_use]
    pub fn to_db_name(&self, name: &str) -> String {
        if self.is_reserved(name) {
            self.quote_identifier(name)
        } else {
            String::from(name)
        }
    }

    /// Schema-qualified table name, where the dialect uses schemas.
    #[must_use]
    pub fn full_table_name(&self, table: &Table) -> String {
        let name = self.to_db_name(&table.name);
        match &table.schema {
            Some(schema) if self.capabilities().use_schema_name => {
                format!("{}.{name}", self.to_db_name(schema))
            }
            _ => name,
        }
    }

    /// A table name that fits the dialect and is not in `taken`.
    #[must_use]
    pub fn valid_table_name(&self, name: &str, taken: &HashSet<String>) -> String {
        self.make_name_valid(name, taken, self.limits.max_table_name_length)
    }

    /// A column name that fits the dialect and is not in `taken`.
    #[must_use]
    pub fn valid_column_name(&self, name: &str, taken: &HashSet<String>) -> String {
        self.make_name_valid(name, taken, self.limits.max_column_name_length)
    }

    /// A constraint name that fits the dialect and is not in `taken`.
    #[must_use]
    pub fn valid_constraint_name(&self, name: &str, taken: &HashSet<String>) -> String {
        self.make_name_valid(name, taken, self.limits.max_constraint_name_length)
    }

    /// Replaces invalid characters, truncates to `max_len`, then appends
    /// a counter until the name is neither reserved nor taken. `taken` is
    /// compared case-insensitively (upper-case entries).
    fn make_name_valid(&self, name: &str, taken: &HashSet<String>, max_len: usize) -> String {
        let base: Vec<char> = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .take(max_len)
            .collect();
        let mut candidate: String = base.iter().collect();
        let mut version = 0_u32;
        while self.is_reserved(&candidate) || taken.contains(&candidate.to_ascii_uppercase()) {
            version += 1;
            let suffix = version.to_string();
            let keep = max_len.saturating_sub(suffix.len()).min(base.len());
            candidate = base[..keep].iter().collect::<String>() + &suffix;
        }
        candidate
    }
}

/// `(major, minor)` from the metadata, parsing the product version string
/// when the driver reports no numbers.
fn detect_version(meta: &DriverMetadata) -> (u32, u32) {
    if meta.database_major_version != 0 {
        return (meta.database_major_version, meta.database_minor_version);
    }
    VERSION_PATTERN
        .captures(&meta.database_product_version)
        .and_then(|caps| {
            let major = caps.get(1)?.as_str().parse().ok()?;
            let minor = caps.get(2)?.as_str().parse().ok()?;
            Some((major, minor))
        })
        .unwrap_or((0, 0))
}
