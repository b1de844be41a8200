//! Pending row mutations of one unit of work.
//!
//! A [`RowManager`] hands out at most one [`PrimaryRow`] per
//! `(table, action, entity)`; callers fill it in incrementally and the
//! flush renders every valid row exactly once. Rows only become visible in
//! the accessors once something was assigned to them.
//!
//! Rows are shared as `Rc<RefCell<_>>`, so a manager and its rows stay on
//! the thread running the flush.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::sync::Arc;

use crate::buffer::SqlBuffer;
use crate::dictionary::DBDictionary;
use crate::error::{Error, Result};
use crate::schema::{Column, Table};
use crate::value::{SqlValue, ToSqlValue};

/// What a row does to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Insert,
    Update,
    Delete,
}

/// Identity of the managed object a primary row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// A pending single-table mutation.
///
/// Updates and deletes must be restricted with [`Row::where_eq`]; only bulk
/// rows from [`RowManager::get_all_rows`] may apply to a whole table.
#[derive(Debug, Clone)]
pub struct Row {
    table: Arc<Table>,
    action: RowAction,
    all_rows: bool,
    valid: bool,
    values: Vec<(Arc<Column>, SqlValue)>,
    conditions: Vec<(Arc<Column>, SqlValue)>,
}

impl Row {
    #[must_use]
    pub const fn new(table: Arc<Table>, action: RowAction) -> Self {
        Self {
            table,
            action,
            all_rows: false,
            valid: false,
            values: vec![],
            conditions: vec![],
        }
    }

    /// A bulk row: without conditions it applies to every row of the table.
    #[must_use]
    pub fn all_rows(table: Arc<Table>, action: RowAction) -> Self {
        Self {
            all_rows: true,
            ..Self::new(table, action)
        }
    }

    #[must_use]
    pub const fn is_all_rows(&self) -> bool {
        self.all_rows
    }

    #[must_use]
    pub const fn table(&self) -> &Arc<Table> {
        &self.table
    }

    #[must_use]
    pub const fn action(&self) -> RowAction {
        self.action
    }

    /// Whether the row has anything to write.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// Assigns `column`. Delete rows carry conditions only.
    pub fn set(&mut self, column: &str, value: impl ToSqlValue) -> Result<()> {
        if self.action == RowAction::Delete {
            return Err(Error::Internal(format!(
                "cannot assign {column} on a delete row of {}",
                self.table.name
            )));
        }
        let column = self.column(column)?;
        let value = value.to_sql_value();
        match self.values.iter_mut().find(|(c, _)| c.name == column.name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column, value)),
        }
        self.valid = true;
        Ok(())
    }

    pub fn set_null(&mut self, column: &str) -> Result<()> {
        self.set(column, SqlValue::Null)
    }

    /// Restricts an update or delete to rows where `column` equals `value`
    /// (`IS NULL` for nulls).
    pub fn where_eq(&mut self, column: &str, value: impl ToSqlValue) -> Result<()> {
        if self.action == RowAction::Insert {
            return Err(Error::Internal(format!(
                "insert rows of {} take no conditions",
                self.table.name
            )));
        }
        let column = self.column(column)?;
        self.conditions.push((column, value.to_sql_value()));
        if self.action == RowAction::Delete {
            self.valid = true;
        }
        Ok(())
    }

    #[must_use]
    pub fn values(&self) -> &[(Arc<Column>, SqlValue)] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(c, _)| c.name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn conditions(&self) -> &[(Arc<Column>, SqlValue)] {
        &self.conditions
    }

    fn column(&self, name: &str) -> Result<Arc<Column>> {
        self.table
            .find_column(name)
            .map(|c| Arc::new(c.clone()))
            .ok_or_else(|| {
                Error::Internal(format!("table {} has no column {name}", self.table.name))
            })
    }

    /// Renders the statement with one placeholder per value. Updates and
    /// deletes of single rows without conditions are refused.
    pub fn to_sql(&self, dict: &DBDictionary) -> Result<SqlBuffer> {
        if self.action != RowAction::Insert && !self.all_rows && self.conditions.is_empty() {
            return Err(Error::Internal(format!(
                "{:?} of {} has no conditions",
                self.action, self.table.name
            )));
        }
        let table = dict.full_table_name(&self.table);
        let mut buf = SqlBuffer::new();
        match self.action {
            RowAction::Insert => {
                buf.append(format!("INSERT INTO {table} ("));
                let names: Vec<String> = self
                    .values
                    .iter()
                    .map(|(c, _)| dict.to_db_name(&c.name))
                    .collect();
                buf.append(names.join(", ")).append(") VALUES (");
                for (i, (column, value)) in self.values.iter().enumerate() {
                    if i > 0 {
                        buf.append(", ");
                    }
                    buf.append_column_value(value.clone(), Arc::clone(column));
                }
                buf.append(")");
            }
            RowAction::Update => {
                if self.values.is_empty() {
                    return Err(Error::Internal(format!(
                        "update of {} assigns no columns",
                        self.table.name
                    )));
                }
                buf.append(format!("UPDATE {table} SET "));
                for (i, (column, value)) in self.values.iter().enumerate() {
                    if i > 0 {
                        buf.append(", ");
                    }
                    buf.append(format!("{} = ", dict.to_db_name(&column.name)));
                    buf.append_column_value(value.clone(), Arc::clone(column));
                }
                self.append_conditions(dict, &mut buf);
            }
            RowAction::Delete => {
                buf.append(format!("DELETE FROM {table}"));
                self.append_conditions(dict, &mut buf);
            }
        }
        Ok(buf)
    }

    fn append_conditions(&self, dict: &DBDictionary, buf: &mut SqlBuffer) {
        for (i, (column, value)) in self.conditions.iter().enumerate() {
            buf.append(if i == 0 { " WHERE " } else { " AND " });
            buf.append(dict.to_db_name(&column.name));
            if value.is_null() {
                buf.append(" IS NULL");
            } else {
                buf.append(" = ");
                buf.append_column_value(value.clone(), Arc::clone(column));
            }
        }
    }
}

/// A row owned by a managed entity.
#[derive(Debug, Clone)]
pub struct PrimaryRow {
    row: Row,
    entity: EntityId,
    index: usize,
}

impl PrimaryRow {
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Creation order within the manager.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl Deref for PrimaryRow {
    type Target = Row;

    fn deref(&self) -> &Row {
        &self.row
    }
}

impl DerefMut for PrimaryRow {
    fn deref_mut(&mut self) -> &mut Row {
        &mut self.row
    }
}

/// A row against a join or dependent table. The manager keeps a copy when
/// it is flushed, so the caller may keep reusing the template.
#[derive(Debug, Clone)]
pub struct SecondaryRow(Row);

impl Deref for SecondaryRow {
    type Target = Row;

    fn deref(&self) -> &Row {
        &self.0
    }
}

impl DerefMut for SecondaryRow {
    fn deref_mut(&mut self) -> &mut Row {
        &mut self.0
    }
}

/// Shared handle to a primary row.
pub type RowRef = Rc<RefCell<PrimaryRow>>;

type RowKey = (String, RowAction, EntityId);

/// Collects the rows of one flush.
#[derive(Debug, Default)]
pub struct RowManager {
    rows: HashMap<RowKey, RowRef>,
    inserts: Vec<RowRef>,
    updates: Vec<RowRef>,
    deletes: Vec<RowRef>,
    ordered: Option<Vec<RowRef>>,
    auto_assign: Vec<RowRef>,
    secondary_updates: Vec<SecondaryRow>,
    secondary_deletes: Vec<SecondaryRow>,
    all_row_updates: Vec<Row>,
    all_row_deletes: Vec<Row>,
    next_index: usize,
    last: Option<(RowKey, RowRef)>,
}

impl RowManager {
    /// With `ordered`, primary rows are also kept in creation order and
    /// flushed that way.
    #[must_use]
    pub fn new(ordered: bool) -> Self {
        Self {
            ordered: ordered.then(Vec::new),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered.is_some()
    }

    /// The row for `(table, action, entity)`. Without `create`, returns
    /// `None` if no such row exists yet.
    pub fn get_row(
        &mut self,
        table: &Arc<Table>,
        action: RowAction,
        entity: EntityId,
        create: bool,
    ) -> Option<RowRef> {
        let key = (table.full_name(), action, entity);
        if let Some((last_key, row)) = &self.last {
            if *last_key == key {
                return Some(Rc::clone(row));
            }
        }
        if let Some(row) = self.rows.get(&key) {
            let row = Rc::clone(row);
            self.last = Some((key, Rc::clone(&row)));
            return Some(row);
        }
        if !create {
            return None;
        }

        let row = Rc::new(RefCell::new(PrimaryRow {
            row: Row::new(Arc::clone(table), action),
            entity,
            index: self.next_index,
        }));
        self.next_index += 1;
        match action {
            RowAction::Insert => self.inserts.push(Rc::clone(&row)),
            RowAction::Update => self.updates.push(Rc::clone(&row)),
            RowAction::Delete => self.deletes.push(Rc::clone(&row)),
        }
        if let Some(ordered) = &mut self.ordered {
            ordered.push(Rc::clone(&row));
        }
        if action == RowAction::Insert && table.has_auto_assigned_columns() {
            self.auto_assign.push(Rc::clone(&row));
        }
        self.rows.insert(key.clone(), Rc::clone(&row));
        self.last = Some((key, Rc::clone(&row)));
        Some(row)
    }

    /// A fresh template for a secondary table.
    #[must_use]
    pub fn get_secondary_row(&self, table: &Arc<Table>, action: RowAction) -> SecondaryRow {
        SecondaryRow(Row::new(Arc::clone(table), action))
    }

    /// A fresh bulk row, applying to every row its conditions match.
    #[must_use]
    pub fn get_all_rows(&self, table: &Arc<Table>, action: RowAction) -> Row {
        Row::all_rows(Arc::clone(table), action)
    }

    /// Records a copy of `row`; invalid rows are skipped.
    pub fn flush_secondary_row(&mut self, row: &SecondaryRow) {
        if !row.is_valid() {
            return;
        }
        match row.action() {
            RowAction::Insert | RowAction::Update => self.secondary_updates.push(row.clone()),
            RowAction::Delete => self.secondary_deletes.push(row.clone()),
        }
    }

    /// Records a bulk row; invalid rows are skipped. Bulk inserts do not
    /// exist.
    pub fn flush_all_rows(&mut self, row: Row) -> Result<()> {
        if !row.is_valid() {
            return Ok(());
        }
        match row.action() {
            RowAction::Update => self.all_row_updates.push(row),
            RowAction::Delete => self.all_row_deletes.push(row),
            RowAction::Insert => {
                return Err(Error::Internal(format!(
                    "bulk row of {} must update or delete",
                    row.table().name
                )))
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn inserts(&self) -> Vec<RowRef> {
        valid(&self.inserts)
    }

    #[must_use]
    pub fn updates(&self) -> Vec<RowRef> {
        valid(&self.updates)
    }

    #[must_use]
    pub fn deletes(&self) -> Vec<RowRef> {
        valid(&self.deletes)
    }

    /// Valid primary rows in creation order; empty when not ordered.
    #[must_use]
    pub fn ordered(&self) -> Vec<RowRef> {
        self.ordered.as_deref().map(valid).unwrap_or_default()
    }

    /// Valid insert rows whose table has auto-assigned columns.
    #[must_use]
    pub fn auto_assign_rows(&self) -> Vec<RowRef> {
        valid(&self.auto_assign)
    }

    #[must_use]
    pub fn secondary_updates(&self) -> &[SecondaryRow] {
        &self.secondary_updates
    }

    #[must_use]
    pub fn secondary_deletes(&self) -> &[SecondaryRow] {
        &self.secondary_deletes
    }

    #[must_use]
    pub fn all_row_updates(&self) -> &[Row] {
        &self.all_row_updates
    }

    #[must_use]
    pub fn all_row_deletes(&self) -> &[Row] {
        &self.all_row_deletes
    }
}

fn valid(rows: &[RowRef]) -> Vec<RowRef> {
    rows.iter()
        .filter(|row| row.borrow().is_valid())
        .map(Rc::clone)
        .collect()
}
