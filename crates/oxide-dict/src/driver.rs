//! The slice of a database driver this crate talks to.
//!
//! Real drivers, pools and transactions live elsewhere; they plug in by
//! implementing [`Connection`] and [`ResultSet`].

use std::collections::VecDeque;
use std::sync::Arc;

use crate::exceptions::SqlError;
use crate::value::SqlValue;

/// Result of a native driver call.
pub type NativeResult<T> = std::result::Result<T, Arc<SqlError>>;

/// Driver and server identity, as reported on connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverMetadata {
    pub database_product_name: String,
    pub database_product_version: String,
    /// `0` when the driver does not report it; the dictionary then parses
    /// `database_product_version`.
    pub database_major_version: u32,
    pub database_minor_version: u32,
    pub driver_name: String,
    pub driver_version: String,
    pub url: Option<String>,
}

/// Statement options derived from a select's capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Request a scrollable (random access) cursor.
    pub scrollable: bool,
    /// Rows are locked as they are read.
    pub for_update: bool,
    /// Fetch size hint for large results.
    pub fetch_size: Option<u32>,
}

/// A forward cursor over rows.
pub trait ResultSet {
    /// Column labels.
    fn columns(&self) -> &[String];

    /// The next row, `None` once exhausted.
    fn next_row(&mut self) -> NativeResult<Option<Vec<SqlValue>>>;
}

/// A database connection.
pub trait Connection {
    /// Driver and server identity.
    fn metadata(&self) -> NativeResult<DriverMetadata>;

    /// Runs a query.
    fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        options: &QueryOptions,
    ) -> NativeResult<Box<dyn ResultSet>>;

    /// Runs a statement and returns the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> NativeResult<u64>;

    /// Keys generated by the last insert, in auto-assigned column order.
    fn generated_keys(&mut self) -> NativeResult<Vec<SqlValue>> {
        Ok(vec![])
    }
}

/// An in-memory result set.
#[derive(Debug, Clone, Default)]
pub struct VecResultSet {
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
}

impl VecResultSet {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
        }
    }

    /// Reads the rest of `rs` into memory.
    pub fn collect(mut rs: Box<dyn ResultSet>) -> NativeResult<Self> {
        let columns = rs.columns().to_vec();
        let mut rows = VecDeque::new();
        while let Some(row) = rs.next_row()? {
            rows.push_back(row);
        }
        Ok(Self { columns, rows })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

impl ResultSet for VecResultSet {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> NativeResult<Option<Vec<SqlValue>>> {
        Ok(self.rows.pop_front())
    }
}

/// Several result sets read one after the other.
pub struct ChainedResultSet {
    columns: Vec<String>,
    sets: VecDeque<Box<dyn ResultSet>>,
}

impl ChainedResultSet {
    #[must_use]
    pub fn new(sets: Vec<Box<dyn ResultSet>>) -> Self {
        let columns = sets.first().map(|s| s.columns().to_vec()).unwrap_or_default();
        Self {
            columns,
            sets: sets.into(),
        }
    }
}

impl ResultSet for ChainedResultSet {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> NativeResult<Option<Vec<SqlValue>>> {
        while let Some(current) = self.sets.front_mut() {
            if let Some(row) = current.next_row()? {
                return Ok(Some(row));
            }
            self.sets.pop_front();
        }
        Ok(None)
    }
}

/// Applies a row window client-side, for databases that cannot express
/// part of it in SQL.
pub struct WindowResultSet {
    inner: Box<dyn ResultSet>,
    skip: u64,
    remaining: Option<u64>,
}

impl WindowResultSet {
    /// Skips `skip` rows, then yields at most `limit` rows.
    #[must_use]
    pub fn new(inner: Box<dyn ResultSet>, skip: u64, limit: Option<u64>) -> Self {
        Self {
            inner,
            skip,
            remaining: limit,
        }
    }
}

impl ResultSet for WindowResultSet {
    fn columns(&self) -> &[String] {
        self.inner.columns()
    }

    fn next_row(&mut self) -> NativeResult<Option<Vec<SqlValue>>> {
        while self.skip > 0 {
            if self.inner.next_row()?.is_none() {
                return Ok(None);
            }
            self.skip -= 1;
        }
        match self.remaining {
            Some(0) => Ok(None),
            Some(ref mut n) => {
                *n -= 1;
                self.inner.next_row()
            }
            None => self.inner.next_row(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Box<dyn ResultSet> {
        Box::new(VecResultSet::new(
            vec![String::from("N")],
            values.iter().map(|v| vec![SqlValue::Int(*v)]).collect(),
        ))
    }

    fn drain(mut rs: impl ResultSet) -> Vec<i64> {
        let mut out = vec![];
        while let Some(row) = rs.next_row().unwrap() {
            out.push(row[0].as_i64().unwrap());
        }
        out
    }

    #[test]
    fn test_chained_result_set_skips_empty_sets() {
        let rs = ChainedResultSet::new(vec![ints(&[1, 2]), ints(&[]), ints(&[3])]);
        assert_eq!(rs.columns(), ["N"]);
        assert_eq!(drain(rs), [1, 2, 3]);
    }

    #[test]
    fn test_window_result_set() {
        assert_eq!(drain(WindowResultSet::new(ints(&[1, 2, 3, 4, 5]), 1, Some(2))), [2, 3]);
        assert_eq!(drain(WindowResultSet::new(ints(&[1, 2, 3]), 2, None)), [3]);
        assert_eq!(drain(WindowResultSet::new(ints(&[1]), 5, Some(1))), Vec::<i64>::new());
    }

    #[test]
    fn test_collect() {
        let vec = VecResultSet::collect(ints(&[4, 5])).unwrap();
        assert_eq!(vec.len(), 2);
        assert!(!vec.is_empty());
    }
}
