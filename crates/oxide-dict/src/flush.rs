//! Writes the rows of a [`RowManager`] through a [`Connection`].
//!
//! Statements run in dependency order: inserts (or the creation order of an
//! ordered manager), updates, secondary updates, bulk updates, secondary
//! deletes, deletes, bulk deletes. Each valid row is executed exactly once.

use tracing::debug;

use crate::dictionary::DBDictionary;
use crate::driver::Connection;
use crate::error::{Error, Result};
use crate::exceptions::{store_error, StoreError, StoreErrorKind};
use crate::row::{EntityId, Row, RowAction, RowManager, RowRef};
use crate::value::SqlValue;

/// What a flush did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushSummary {
    pub statements: usize,
    pub rows_affected: u64,
    /// Keys the database assigned, per inserted entity.
    pub generated_keys: Vec<(EntityId, Vec<SqlValue>)>,
}

/// Executes every valid row of `manager`.
///
/// A primary update or delete that matches no row fails with
/// [`StoreErrorKind::OptimisticLock`]: the row was changed or removed
/// concurrently.
pub fn flush(
    manager: &RowManager,
    conn: &mut dyn Connection,
    dict: &DBDictionary,
) -> Result<FlushSummary> {
    let mut flusher = Flusher {
        conn,
        dict,
        summary: FlushSummary::default(),
    };

    if manager.is_ordered() {
        for row in manager.ordered() {
            flusher.primary(&row)?;
        }
    } else {
        for row in manager.inserts().iter().chain(&manager.updates()) {
            flusher.primary(row)?;
        }
    }
    for row in manager.secondary_updates() {
        flusher.execute(row, None)?;
    }
    for row in manager.all_row_updates() {
        flusher.execute(row, None)?;
    }
    for row in manager.secondary_deletes() {
        flusher.execute(row, None)?;
    }
    if !manager.is_ordered() {
        for row in manager.deletes() {
            flusher.primary(&row)?;
        }
    }
    for row in manager.all_row_deletes() {
        flusher.execute(row, None)?;
    }

    debug!(
        statements = flusher.summary.statements,
        rows = flusher.summary.rows_affected,
        "flush complete"
    );
    Ok(flusher.summary)
}

struct Flusher<'a> {
    conn: &'a mut dyn Connection,
    dict: &'a DBDictionary,
    summary: FlushSummary,
}

impl Flusher<'_> {
    fn primary(&mut self, row: &RowRef) -> Result<()> {
        let (entity, action, auto_assign) = {
            let primary = row.borrow();
            let entity = primary.entity();
            let failed = Some(format!("{} {entity:?}", primary.table().name));
            let count = self.execute(&primary, failed.clone())?;
            if count == 0 && primary.action() != RowAction::Insert {
                let mut err = StoreError::new(
                    StoreErrorKind::OptimisticLock,
                    format!(
                        "{:?} of {} matched no row",
                        primary.action(),
                        primary.table().name
                    ),
                );
                err.failed = failed;
                return Err(Error::Store(err));
            }
            (
                entity,
                primary.action(),
                primary.table().has_auto_assigned_columns(),
            )
        };

        if action == RowAction::Insert && auto_assign {
            let keys = self
                .conn
                .generated_keys()
                .map_err(|e| store_error("reading generated keys failed", &e, self.dict, None))?;
            let mut primary = row.borrow_mut();
            let columns: Vec<String> = primary
                .table()
                .columns
                .iter()
                .filter(|c| c.auto_assigned)
                .map(|c| c.name.clone())
                .collect();
            for (column, key) in columns.iter().zip(&keys) {
                primary.set(column, key.clone())?;
            }
            self.summary.generated_keys.push((entity, keys));
        }
        Ok(())
    }

    fn execute(&mut self, row: &Row, failed: Option<String>) -> Result<u64> {
        let buf = row.to_sql(self.dict)?;
        let params = self.dict.bind_parameters(&buf)?;
        let sql = buf.to_sql();
        debug!(sql = %sql, params = params.len(), "flush");
        let count = self.conn.execute(&sql, &params).map_err(|e| {
            store_error(
                format!("{:?} of {} failed", row.action(), row.table().name),
                &e,
                self.dict,
                failed,
            )
        })?;
        self.summary.statements += 1;
        self.summary.rows_affected += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::driver::{DriverMetadata, NativeResult, QueryOptions, ResultSet};
    use crate::exceptions::SqlError;
    use crate::schema::{Column, ColumnType, Table};

    #[derive(Default)]
    struct Recorder {
        executed: Vec<String>,
        affected: u64,
        fail_on: Option<&'static str>,
    }

    impl Connection for Recorder {
        fn metadata(&self) -> NativeResult<DriverMetadata> {
            Ok(DriverMetadata::default())
        }

        fn query(
            &mut self,
            _sql: &str,
            _params: &[SqlValue],
            _options: &QueryOptions,
        ) -> NativeResult<Box<dyn ResultSet>> {
            Err(Arc::new(SqlError::new("no queries here")))
        }

        fn execute(&mut self, sql: &str, _params: &[SqlValue]) -> NativeResult<u64> {
            if self.fail_on.is_some_and(|f| sql.starts_with(f)) {
                return Err(Arc::new(
                    SqlError::new("duplicate key").with_sql_state("23505"),
                ));
            }
            self.executed.push(String::from(sql));
            Ok(self.affected)
        }

        fn generated_keys(&mut self) -> NativeResult<Vec<SqlValue>> {
            Ok(vec![SqlValue::Int(42)])
        }
    }

    fn author() -> Arc<Table> {
        Arc::new(
            Table::new("AUTHOR")
                .column(Column::new("ID", ColumnType::BigInt).auto_assign())
                .column(Column::new("NAME", ColumnType::Varchar)),
        )
    }

    #[test]
    fn test_order_and_exactly_once() {
        let table = author();
        let dict = DBDictionary::base();
        let mut rm = RowManager::new(false);

        let delete = rm.get_row(&table, RowAction::Delete, EntityId(3), true).unwrap();
        delete.borrow_mut().where_eq("ID", 3).unwrap();
        let update = rm.get_row(&table, RowAction::Update, EntityId(2), true).unwrap();
        update.borrow_mut().set("NAME", "b").unwrap();
        update.borrow_mut().where_eq("ID", 2).unwrap();
        let insert = rm.get_row(&table, RowAction::Insert, EntityId(1), true).unwrap();
        insert.borrow_mut().set("NAME", "a").unwrap();
        // Fetched again and assigned again: still one statement.
        rm.get_row(&table, RowAction::Insert, EntityId(1), true)
            .unwrap()
            .borrow_mut()
            .set("NAME", "a2")
            .unwrap();
        // Never assigned.
        rm.get_row(&table, RowAction::Insert, EntityId(4), true).unwrap();

        let mut conn = Recorder {
            affected: 1,
            ..Recorder::default()
        };
        let summary = flush(&rm, &mut conn, &dict).unwrap();
        assert_eq!(
            conn.executed,
            [
                "INSERT INTO AUTHOR (NAME) VALUES (?)",
                "UPDATE AUTHOR SET NAME = ? WHERE ID = ?",
                "DELETE FROM AUTHOR WHERE ID = ?",
            ]
        );
        assert_eq!(summary.statements, 3);
        assert_eq!(summary.generated_keys, [(EntityId(1), vec![SqlValue::Int(42)])]);
        assert_eq!(insert.borrow().value("ID"), Some(&SqlValue::Int(42)));
    }

    #[test]
    fn test_stale_update_is_optimistic_lock_failure() {
        let table = author();
        let dict = DBDictionary::base();
        let mut rm = RowManager::new(false);
        let update = rm.get_row(&table, RowAction::Update, EntityId(2), true).unwrap();
        update.borrow_mut().set("NAME", "b").unwrap();
        update.borrow_mut().where_eq("ID", 2).unwrap();

        let mut conn = Recorder::default();
        match flush(&rm, &mut conn, &dict) {
            Err(Error::Store(err)) => assert_eq!(err.kind, StoreErrorKind::OptimisticLock),
            other => panic!("expected optimistic lock failure, got {other:?}"),
        }
        assert_eq!(conn.executed, ["UPDATE AUTHOR SET NAME = ? WHERE ID = ?"]);
    }

    #[test]
    fn test_update_without_conditions_never_runs() {
        let table = author();
        let dict = DBDictionary::base();
        let mut rm = RowManager::new(false);
        let update = rm.get_row(&table, RowAction::Update, EntityId(2), true).unwrap();
        update.borrow_mut().set("NAME", "b").unwrap();

        let mut conn = Recorder {
            affected: 5,
            ..Recorder::default()
        };
        assert!(matches!(flush(&rm, &mut conn, &dict), Err(Error::Internal(_))));
        assert!(conn.executed.is_empty());
    }

    #[test]
    fn test_native_failure_is_classified() {
        let table = author();
        let dict = DBDictionary::base();
        let mut rm = RowManager::new(false);
        let insert = rm.get_row(&table, RowAction::Insert, EntityId(1), true).unwrap();
        insert.borrow_mut().set("NAME", "a").unwrap();

        let mut conn = Recorder {
            fail_on: Some("INSERT"),
            ..Recorder::default()
        };
        let Err(Error::Store(err)) = flush(&rm, &mut conn, &dict) else {
            panic!("insert should fail");
        };
        assert!(err.has_code("23505"));
        assert!(err.failed.is_some());
    }
}
