//! # oxide-dict
//!
//! Per-database SQL dictionaries for an object-relational persistence layer.
//!
//! A [`DBDictionary`] knows how one database product spells the fragments a
//! query compiler needs: substrings, string search, pagination windows, lock
//! clauses, join syntax, DDL and type names. It also converts values for
//! binding and classifies native errors. Around it sit the building blocks
//! that consult it:
//! - [`SqlBuffer`] accumulates SQL text and placeholders whose
//!   [`BindParameter`] values are scoped to the executing thread
//! - [`Select`] and [`Union`] render and run queries, falling back to
//!   client-side windows or separate execution where the database is limited
//! - [`RowManager`] collects the insert, update and delete rows of a unit of
//!   work, and [`flush`](flush::flush) executes each valid row once
//!
//! ## Example
//!
//! ```rust
//! use oxide_dict::{DictionaryFactory, FilterValue, SqlBuffer};
//!
//! let dict = DictionaryFactory::new().for_name("mysql").unwrap();
//! let mut buf = SqlBuffer::from_sql("SELECT ");
//! dict.substring(
//!     &mut buf,
//!     &FilterValue::expr("t0.NAME"),
//!     &FilterValue::Number(2),
//!     Some(&FilterValue::Number(5)),
//! );
//! assert_eq!(buf.to_sql(), "SELECT SUBSTRING(t0.NAME, 3, 3)");
//! ```

pub mod boolean;
pub mod buffer;
pub mod dictionary;
pub mod driver;
pub mod error;
pub mod exceptions;
pub mod flush;
pub mod join;
pub mod row;
pub mod schema;
pub mod select;
pub mod value;

pub use boolean::{BooleanRepresentation, BooleanRepresentationFactory};
pub use buffer::{BindParameter, FilterValue, SqlBuffer};
pub use dictionary::{
    Capabilities, DBDictionary, DictionaryConfig, DictionaryFactory, RangeContext, RangePosition,
    UNBOUNDED,
};
pub use driver::{Connection, DriverMetadata, ResultSet, VecResultSet};
pub use error::{Error, Result};
pub use exceptions::{SqlError, StoreError, StoreErrorKind};
pub use flush::FlushSummary;
pub use join::{Join, JoinSyntax, JoinType};
pub use row::{EntityId, Row, RowAction, RowManager};
pub use schema::{Column, ColumnType, ForeignKey, PrimaryKey, Table};
pub use select::{LockLevel, Select, SelectExecutor, Union};
pub use value::{SqlValue, ToSqlValue};
