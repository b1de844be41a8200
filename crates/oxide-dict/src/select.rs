//! Select statements and unions of them.
//!
//! A [`Select`] is rendered against the capabilities the dictionary has at
//! execution time. Parts of the row window the database cannot express are
//! applied client-side, and a lock request the database cannot honour for
//! this shape of query degrades to an unlocked read with a warning.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::buffer::SqlBuffer;
use crate::dictionary::{Capabilities, DBDictionary, RangeContext, RangePosition, UNBOUNDED};
use crate::driver::{
    ChainedResultSet, Connection, QueryOptions, ResultSet, VecResultSet, WindowResultSet,
};
use crate::error::{Error, Result};
use crate::exceptions::store_error;
use crate::join::{Join, JoinSyntax, JoinType};
use crate::schema::Table;
use crate::value::ToSqlValue;

/// Lock requested for the rows read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockLevel {
    #[default]
    None,
    /// Verified at commit; needs nothing from the statement.
    Read,
    /// Rows are locked as they are read (`SELECT ... FOR UPDATE`).
    Write,
}

/// A hint of how many rows a select yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedResultCount {
    pub count: u64,
    /// Forced hints are not replaced by estimates.
    pub forced: bool,
}

/// Something that renders and runs as one logical select.
pub trait SelectExecutor {
    /// Full statement text. With `for_update`, lock clauses are included as
    /// far as the dialect supports them.
    fn to_select(&self, for_update: bool) -> Result<SqlBuffer>;

    /// Statement counting the rows [`to_select`](Self::to_select) returns,
    /// before any row window is applied.
    fn to_select_count(&self) -> Result<SqlBuffer>;

    /// Whether to-many joins make the select distinct.
    fn auto_distinct(&self) -> bool;

    fn set_auto_distinct(&mut self, auto_distinct: bool);

    fn is_distinct(&self) -> bool;

    /// Whether results are expected to be too large to buffer.
    fn is_large_result(&self) -> bool;

    fn set_large_result(&mut self, large: bool);

    fn is_large_transaction(&self) -> bool;

    fn set_large_transaction(&mut self, large: bool);

    fn join_syntax(&self) -> JoinSyntax;

    fn set_join_syntax(&mut self, syntax: JoinSyntax);

    /// Whether results can be read through a scrollable cursor.
    fn supports_random_access(&self, for_update: bool) -> bool;

    /// Whether the rows can be locked by the statement itself.
    fn supports_locking(&self) -> bool;

    /// Number of rows the select yields, row window included.
    fn count(&self, conn: &mut dyn Connection) -> Result<u64>;

    fn execute(&self, conn: &mut dyn Connection) -> Result<Box<dyn ResultSet>> {
        self.execute_with_lock(conn, LockLevel::None)
    }

    fn execute_with_lock(
        &self,
        conn: &mut dyn Connection,
        lock: LockLevel,
    ) -> Result<Box<dyn ResultSet>>;

    fn expected_result_count(&self) -> Option<u64>;

    /// Records a row count hint. A non-forced hint does not replace a
    /// forced one.
    fn set_expected_result_count(&mut self, count: u64, force: bool);
}

fn merge_expected(
    current: Option<ExpectedResultCount>,
    count: u64,
    forced: bool,
) -> Option<ExpectedResultCount> {
    if !forced && current.is_some_and(|e| e.forced) {
        return current;
    }
    Some(ExpectedResultCount { count, forced })
}

/// Publishes the server's capabilities on the dictionary before rendering.
fn detect(dict: &DBDictionary, conn: &dyn Connection) -> Result<()> {
    if dict.connected().is_some() {
        return Ok(());
    }
    let meta = conn
        .metadata()
        .map_err(|e| store_error("cannot read driver metadata", &e, dict, None))?;
    dict.connected_configuration(&meta);
    Ok(())
}

/// Runs `buf`. With `consume`, the calling thread's bindings are released
/// once read; union branches leave that to the union.
fn run_query(
    dict: &DBDictionary,
    conn: &mut dyn Connection,
    buf: &SqlBuffer,
    options: &QueryOptions,
    consume: bool,
) -> Result<Box<dyn ResultSet>> {
    let params = if consume {
        dict.bind_parameters(buf)?
    } else {
        dict.parameter_values(buf)?
    };
    let sql = buf.to_sql();
    debug!(sql = %sql, params = params.len(), for_update = options.for_update, "select");
    conn.query(&sql, &params, options)
        .map_err(|e| Error::Store(store_error(format!("query failed: {sql}"), &e, dict, None)))
}

fn run_count(
    dict: &DBDictionary,
    conn: &mut dyn Connection,
    buf: &SqlBuffer,
    consume: bool,
) -> Result<u64> {
    let mut rs = run_query(dict, conn, buf, &QueryOptions::default(), consume)?;
    let row = rs
        .next_row()
        .map_err(|e| store_error("reading count failed", &e, dict, None))?;
    let count = row
        .as_ref()
        .and_then(|r| r.first())
        .and_then(|v| v.as_i64())
        .ok_or_else(|| Error::InvalidValue(String::from("count query returned no integer")))?;
    u64::try_from(count).map_err(|_| Error::InvalidValue(format!("negative count {count}")))
}

/// A single select over one root table and its joins.
#[derive(Debug, Clone)]
pub struct Select {
    dict: Arc<DBDictionary>,
    table: Arc<Table>,
    alias: String,
    columns: Vec<String>,
    joins: Vec<Join>,
    wheres: Vec<SqlBuffer>,
    ordering: Vec<String>,
    distinct: bool,
    auto_distinct: bool,
    large_result: bool,
    large_transaction: bool,
    join_syntax: JoinSyntax,
    start: u64,
    end: u64,
    subselect: bool,
    expected: Option<ExpectedResultCount>,
}

impl Select {
    /// `SELECT * FROM table alias`, using the dictionary's join syntax.
    #[must_use]
    pub fn new(dict: Arc<DBDictionary>, table: Arc<Table>, alias: impl Into<String>) -> Self {
        let join_syntax = dict.default_join_syntax;
        Self {
            dict,
            table,
            alias: alias.into(),
            columns: vec![],
            joins: vec![],
            wheres: vec![],
            ordering: vec![],
            distinct: false,
            auto_distinct: true,
            large_result: false,
            large_transaction: false,
            join_syntax,
            start: 0,
            end: UNBOUNDED,
            subselect: false,
            expected: None,
        }
    }

    #[must_use]
    pub fn dictionary(&self) -> &DBDictionary {
        &self.dict
    }

    /// Adds a select-list expression, e.g. `t0.NAME`.
    pub fn column(&mut self, expr: impl Into<String>) -> &mut Self {
        self.columns.push(expr.into());
        self
    }

    /// Adds a join unless an equal one is already present.
    pub fn join(&mut self, join: Join) -> bool {
        if self.joins.contains(&join) {
            return false;
        }
        self.joins.push(join);
        true
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Adds a condition; conditions are combined with `AND`.
    pub fn where_sql(&mut self, condition: SqlBuffer) -> &mut Self {
        self.wheres.push(condition);
        self
    }

    /// `expr = ?` with `value` as parameter.
    pub fn where_eq(&mut self, expr: &str, value: impl ToSqlValue) -> &mut Self {
        let mut condition = SqlBuffer::from_sql(format!("{expr} = "));
        condition.append_value(value);
        self.where_sql(condition)
    }

    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.ordering.push(expr.into());
        self
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    /// Restricts results to rows `start..end`; `end` may be [`UNBOUNDED`].
    pub fn set_range(&mut self, start: u64, end: u64) -> Result<()> {
        if end < start {
            return Err(Error::InvalidValue(format!(
                "range end {end} is before start {start}"
            )));
        }
        self.start = start;
        self.end = end;
        Ok(())
    }

    #[must_use]
    pub const fn range(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    /// Marks the select as nested inside another statement.
    pub fn set_subselect(&mut self, subselect: bool) {
        self.subselect = subselect;
    }

    fn has_range(&self) -> bool {
        !(self.start == 0 && self.end == UNBOUNDED)
    }

    /// Whether this select may be a branch of a SQL `UNION`.
    #[must_use]
    pub fn allows_union(&self) -> bool {
        !self.has_range() && self.ordering.is_empty()
    }

    /// Drops the calling thread's bindings on this select's parameters.
    pub fn clear_bindings(&self) {
        for condition in &self.wheres {
            condition.clear_bindings();
        }
    }

    fn count_rows(&self, conn: &mut dyn Connection, consume: bool) -> Result<u64> {
        detect(&self.dict, conn)?;
        let total = run_count(&self.dict, conn, &self.to_select_count()?, consume)?;
        Ok(self.windowed_count(total))
    }

    fn execute_rows(
        &self,
        conn: &mut dyn Connection,
        lock: LockLevel,
        consume: bool,
    ) -> Result<Box<dyn ResultSet>> {
        detect(&self.dict, conn)?;
        let mut for_update = lock == LockLevel::Write;
        if for_update && !self.supports_locking() {
            warn!(
                platform = %self.dict.platform,
                table = %self.table.name,
                "database cannot lock rows of this select; reading without lock"
            );
            for_update = false;
        }
        let buf = self.to_select(for_update)?;
        let options = QueryOptions {
            scrollable: self.supports_random_access(for_update),
            for_update,
            fetch_size: if self.large_result {
                self.dict.large_fetch_size
            } else {
                None
            },
        };
        let rs = run_query(&self.dict, conn, &buf, &options, consume)?;
        Ok(self.client_window(self.dict.capabilities(), rs))
    }

    /// How many of `total` matching rows fall inside the window.
    fn windowed_count(&self, total: u64) -> u64 {
        let rest = total.saturating_sub(self.start);
        if self.end == UNBOUNDED {
            rest
        } else {
            rest.min(self.end - self.start)
        }
    }

    /// The part of the window expressed in SQL.
    fn sql_window(&self, caps: &Capabilities) -> (u64, u64) {
        let start = if caps.supports_select_start_index {
            self.start
        } else {
            0
        };
        let end = if caps.supports_select_end_index {
            self.end
        } else {
            UNBOUNDED
        };
        (start, end)
    }

    /// Wraps `rs` with what the SQL could not express of the window.
    fn client_window(&self, caps: &Capabilities, rs: Box<dyn ResultSet>) -> Box<dyn ResultSet> {
        let (sql_start, sql_end) = self.sql_window(caps);
        let skip = self.start - sql_start;
        let limit = (sql_end != self.end && self.end != UNBOUNDED).then(|| self.end - self.start);
        if skip == 0 && limit.is_none() {
            return rs;
        }
        debug!(skip, ?limit, "applying row window client-side");
        Box::new(WindowResultSet::new(rs, skip, limit))
    }

    fn render(&self, for_update: bool, with_range: bool) -> Result<SqlBuffer> {
        let caps = self.dict.capabilities();
        let (start, end) = if with_range {
            self.sql_window(caps)
        } else {
            (0, UNBOUNDED)
        };
        let ctx = RangeContext {
            start,
            end,
            subselect: self.subselect,
            has_order_by: !self.ordering.is_empty(),
        };
        let range_at = |position: RangePosition, buf: &mut SqlBuffer| {
            if caps.range_position == position {
                self.dict.append_select_range(buf, &ctx);
            }
        };

        let mut buf = SqlBuffer::from_sql("SELECT");
        range_at(RangePosition::PreDistinct, &mut buf);
        if self.is_distinct() {
            buf.append(" DISTINCT");
        }
        range_at(RangePosition::PostDistinct, &mut buf);
        buf.append(" ");
        if self.columns.is_empty() {
            buf.append("*");
        } else {
            buf.append(self.columns.join(", "));
        }
        self.append_from_where(&mut buf, for_update)?;
        if !self.ordering.is_empty() {
            buf.append(" ORDER BY ").append(self.ordering.join(", "));
        }
        range_at(RangePosition::PostSelect, &mut buf);
        if for_update {
            if let Some(clause) = &self.dict.for_update_clause {
                buf.append(" ").append(clause);
            }
        }
        range_at(RangePosition::PostLock, &mut buf);
        Ok(buf)
    }

    fn append_from_where(&self, buf: &mut SqlBuffer, for_update: bool) -> Result<()> {
        let mut from = SqlBuffer::from_sql(format!(
            "{} {}",
            self.dict.full_table_name(&self.table),
            self.alias
        ));
        if for_update {
            if let Some(hint) = &self.dict.table_for_update_clause {
                from.append(" ").append(hint);
            }
        }
        let mut conditions = vec![];
        for join in &self.joins {
            self.dict
                .append_join(join, self.join_syntax, &mut from, &mut conditions)?;
        }
        conditions.extend(self.wheres.iter().cloned());

        buf.append(" FROM ").append_buffer(&from);
        for (i, condition) in conditions.iter().enumerate() {
            buf.append(if i == 0 { " WHERE " } else { " AND " });
            buf.append_buffer(condition);
        }
        Ok(())
    }
}

impl SelectExecutor for Select {
    fn to_select(&self, for_update: bool) -> Result<SqlBuffer> {
        self.render(for_update, true)
    }

    fn to_select_count(&self) -> Result<SqlBuffer> {
        let caps = self.dict.capabilities();
        let mut buf = SqlBuffer::from_sql("SELECT COUNT(*)");
        if !self.is_distinct() {
            self.append_from_where(&mut buf, false)?;
            return Ok(buf);
        }
        if caps.supports_subselect {
            let inner = self.render(false, false)?;
            buf.append(" FROM (").append_buffer(&inner).append(")");
            if caps.requires_alias_for_subselect {
                buf.append(" t_count");
            }
            return Ok(buf);
        }
        match self.columns.as_slice() {
            [column] => {
                let mut buf = SqlBuffer::from_sql(format!("SELECT COUNT(DISTINCT {column})"));
                self.append_from_where(&mut buf, false)?;
                Ok(buf)
            }
            _ => Err(Error::unsupported(
                &self.dict.platform,
                "counting a distinct multi-column select without subselects",
            )),
        }
    }

    fn auto_distinct(&self) -> bool {
        self.auto_distinct
    }

    fn set_auto_distinct(&mut self, auto_distinct: bool) {
        self.auto_distinct = auto_distinct;
    }

    fn is_distinct(&self) -> bool {
        self.distinct || (self.auto_distinct && self.joins.iter().any(Join::is_to_many))
    }

    fn is_large_result(&self) -> bool {
        self.large_result
    }

    fn set_large_result(&mut self, large: bool) {
        self.large_result = large;
    }

    fn is_large_transaction(&self) -> bool {
        self.large_transaction
    }

    fn set_large_transaction(&mut self, large: bool) {
        self.large_transaction = large;
    }

    fn join_syntax(&self) -> JoinSyntax {
        self.join_syntax
    }

    fn set_join_syntax(&mut self, syntax: JoinSyntax) {
        self.join_syntax = syntax;
    }

    fn supports_random_access(&self, for_update: bool) -> bool {
        let caps = self.dict.capabilities();
        caps.supports_scrollable_result_sets && (!for_update || self.supports_locking())
    }

    fn supports_locking(&self) -> bool {
        let caps = self.dict.capabilities();
        let has_clause =
            self.dict.for_update_clause.is_some() || self.dict.table_for_update_clause.is_some();
        caps.supports_select_for_update
            && has_clause
            && (caps.supports_lock_with_distinct || !self.is_distinct())
            && (caps.supports_lock_with_outer_join
                || !self.joins.iter().any(|j| j.join_type() == JoinType::Outer))
            && (caps.supports_lock_with_multiple_tables || self.joins.is_empty())
            && (caps.supports_lock_with_order_by || self.ordering.is_empty())
            && (caps.supports_lock_with_select_range || !self.has_range())
    }

    fn count(&self, conn: &mut dyn Connection) -> Result<u64> {
        self.count_rows(conn, true)
    }

    fn execute_with_lock(
        &self,
        conn: &mut dyn Connection,
        lock: LockLevel,
    ) -> Result<Box<dyn ResultSet>> {
        self.execute_rows(conn, lock, true)
    }

    fn expected_result_count(&self) -> Option<u64> {
        self.expected.map(|e| e.count)
    }

    fn set_expected_result_count(&mut self, count: u64, force: bool) {
        self.expected = merge_expected(self.expected, count, force);
    }
}

/// Several selects yielding one combined result.
///
/// Rendered as a SQL `UNION` when the database and every branch allow it;
/// otherwise each select runs on its own and the results are chained.
#[derive(Debug, Clone)]
pub struct Union {
    dict: Arc<DBDictionary>,
    selects: Vec<Select>,
    ordering: Vec<String>,
    single_result: bool,
    aborted: bool,
    expected: Option<ExpectedResultCount>,
}

impl Union {
    #[must_use]
    pub fn new(dict: Arc<DBDictionary>, selects: Vec<Select>) -> Self {
        Self {
            dict,
            selects,
            ordering: vec![],
            single_result: false,
            aborted: false,
            expected: None,
        }
    }

    #[must_use]
    pub fn selects(&self) -> &[Select] {
        &self.selects
    }

    pub fn selects_mut(&mut self) -> &mut [Select] {
        &mut self.selects
    }

    /// Orders the combined result, e.g. by select-list position `1`.
    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.ordering.push(expr.into());
        self
    }

    /// Whether at most one branch is expected to have rows.
    #[must_use]
    pub const fn is_single_result(&self) -> bool {
        self.single_result
    }

    pub fn set_single_result(&mut self, single: bool) {
        self.single_result = single;
    }

    /// Forces separate execution from now on.
    pub fn abort_union(&mut self) {
        self.aborted = true;
    }

    /// Whether the selects are combined into one SQL statement.
    #[must_use]
    pub fn is_union(&self) -> bool {
        !self.aborted
            && self.selects.len() > 1
            && self.dict.capabilities().supports_union
            && self.selects.iter().all(Select::allows_union)
    }

    fn render_union(&self) -> Result<SqlBuffer> {
        let separator = if self.is_distinct() {
            " UNION "
        } else {
            " UNION ALL "
        };
        let mut buf = SqlBuffer::new();
        for (i, select) in self.selects.iter().enumerate() {
            if i > 0 {
                buf.append(separator);
            }
            buf.append_buffer(&select.to_select(false)?);
        }
        if !self.ordering.is_empty() {
            buf.append(" ORDER BY ").append(self.ordering.join(", "));
        }
        Ok(buf)
    }
}

impl SelectExecutor for Union {
    fn to_select(&self, for_update: bool) -> Result<SqlBuffer> {
        if for_update {
            return Err(Error::unsupported(&self.dict.platform, "locking a union"));
        }
        match self.selects.as_slice() {
            [select] => select.to_select(false),
            _ if self.is_union() => self.render_union(),
            _ => Err(Error::Internal(String::from(
                "selects of this union must be executed separately",
            ))),
        }
    }

    fn to_select_count(&self) -> Result<SqlBuffer> {
        if let [select] = self.selects.as_slice() {
            return select.to_select_count();
        }
        if !self.is_union() || !self.dict.capabilities().supports_subselect {
            return Err(Error::Internal(String::from(
                "selects of this union must be counted separately",
            )));
        }
        let mut buf = SqlBuffer::from_sql("SELECT COUNT(*) FROM (");
        buf.append_buffer(&self.render_union()?).append(")");
        if self.dict.capabilities().requires_alias_for_subselect {
            buf.append(" t_count");
        }
        Ok(buf)
    }

    fn auto_distinct(&self) -> bool {
        self.selects.iter().any(Select::auto_distinct)
    }

    fn set_auto_distinct(&mut self, auto_distinct: bool) {
        for select in &mut self.selects {
            select.set_auto_distinct(auto_distinct);
        }
    }

    fn is_distinct(&self) -> bool {
        self.selects.iter().any(Select::is_distinct)
    }

    fn is_large_result(&self) -> bool {
        self.selects.iter().any(Select::is_large_result)
    }

    fn set_large_result(&mut self, large: bool) {
        for select in &mut self.selects {
            select.set_large_result(large);
        }
    }

    fn is_large_transaction(&self) -> bool {
        self.selects.iter().any(Select::is_large_transaction)
    }

    fn set_large_transaction(&mut self, large: bool) {
        for select in &mut self.selects {
            select.set_large_transaction(large);
        }
    }

    fn join_syntax(&self) -> JoinSyntax {
        self.selects
            .first()
            .map_or(self.dict.default_join_syntax, Select::join_syntax)
    }

    fn set_join_syntax(&mut self, syntax: JoinSyntax) {
        for select in &mut self.selects {
            select.set_join_syntax(syntax);
        }
    }

    fn supports_random_access(&self, for_update: bool) -> bool {
        if self.is_union() {
            return !for_update && self.dict.capabilities().supports_scrollable_result_sets;
        }
        self.selects
            .iter()
            .all(|s| s.supports_random_access(for_update))
    }

    fn supports_locking(&self) -> bool {
        !self.is_union() && self.selects.iter().all(Select::supports_locking)
    }

    fn count(&self, conn: &mut dyn Connection) -> Result<u64> {
        detect(&self.dict, conn)?;
        if self.selects.len() > 1 && self.is_union() && self.dict.capabilities().supports_subselect
        {
            return run_count(&self.dict, conn, &self.to_select_count()?, true);
        }
        let _release = ReleaseBindings(&self.selects);
        let mut total = 0;
        for select in &self.selects {
            total += select.count_rows(conn, false)?;
        }
        Ok(total)
    }

    fn execute_with_lock(
        &self,
        conn: &mut dyn Connection,
        lock: LockLevel,
    ) -> Result<Box<dyn ResultSet>> {
        detect(&self.dict, conn)?;
        if self.selects.len() > 1 && self.is_union() {
            if lock == LockLevel::Write {
                warn!(platform = %self.dict.platform, "unions cannot lock rows; reading without lock");
            }
            let options = QueryOptions {
                scrollable: self.supports_random_access(false),
                for_update: false,
                fetch_size: if self.is_large_result() {
                    self.dict.large_fetch_size
                } else {
                    None
                },
            };
            return run_query(&self.dict, conn, &self.render_union()?, &options, true);
        }

        // Branches may share parameters; release them after the last one.
        let _release = ReleaseBindings(&self.selects);
        let mut results: Vec<Box<dyn ResultSet>> = Vec::with_capacity(self.selects.len());
        for select in &self.selects {
            let rs = select.execute_rows(conn, lock, false)?;
            if !self.single_result {
                results.push(rs);
                continue;
            }
            let rows = VecResultSet::collect(rs)
                .map_err(|e| store_error("reading union branch failed", &e, &self.dict, None))?;
            if !rows.is_empty() {
                return Ok(Box::new(rows));
            }
            results.push(Box::new(rows));
        }
        Ok(Box::new(ChainedResultSet::new(results)))
    }

    fn expected_result_count(&self) -> Option<u64> {
        self.expected.map(|e| e.count)
    }

    fn set_expected_result_count(&mut self, count: u64, force: bool) {
        self.expected = merge_expected(self.expected, count, force);
    }
}

/// Clears the bindings of every branch when dropped.
struct ReleaseBindings<'a>(&'a [Select]);

impl Drop for ReleaseBindings<'_> {
    fn drop(&mut self) {
        for select in self.0 {
            select.clear_bindings();
        }
    }
}
