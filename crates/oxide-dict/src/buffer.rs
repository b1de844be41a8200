//! Accumulating SQL text with positional placeholders.
//!
//! A [`SqlBuffer`] is built once and may then be cached and executed by many
//! threads. Placeholders that carry a [`BindParameter`] can be rebound per
//! thread: binding writes the calling thread's slot of the parameter and
//! never touches the buffer, so each executing thread binds its own values
//! right before it reads [`SqlBuffer::parameters`]. Executing a statement
//! through [`DBDictionary::bind_parameters`] consumes the calling thread's
//! bindings, so parameters of cached buffers hold no slot for threads that
//! are done with them.
//!
//! [`DBDictionary::bind_parameters`]: crate::dictionary::DBDictionary::bind_parameters

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::schema::Column;
use crate::value::{SqlValue, ToSqlValue};

/// A named parameter whose value is supplied per executing thread.
pub struct BindParameter {
    key: Option<String>,
    user_defined: bool,
    column: Option<Arc<Column>>,
    default_value: SqlValue,
    values: RwLock<HashMap<ThreadId, SqlValue>>,
}

impl BindParameter {
    /// Creates a parameter. User-defined parameters must have a key.
    pub fn new(
        key: Option<String>,
        user_defined: bool,
        column: Option<Arc<Column>>,
        default_value: SqlValue,
    ) -> Result<Self> {
        if user_defined && key.is_none() {
            return Err(Error::Internal(String::from(
                "user-defined bind parameter without a key",
            )));
        }
        Ok(Self {
            key,
            user_defined,
            column,
            default_value,
            values: RwLock::new(HashMap::new()),
        })
    }

    /// A user-supplied parameter such as `:name` or `?1`.
    #[must_use]
    pub fn user(key: impl Into<String>, default_value: SqlValue) -> Self {
        Self {
            key: Some(key.into()),
            user_defined: true,
            column: None,
            default_value,
            values: RwLock::new(HashMap::new()),
        }
    }

    /// A parameter generated while compiling a query.
    #[must_use]
    pub fn system(column: Option<Arc<Column>>, default_value: SqlValue) -> Self {
        Self {
            key: None,
            user_defined: false,
            column,
            default_value,
            values: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[must_use]
    pub const fn is_user_defined(&self) -> bool {
        self.user_defined
    }

    #[must_use]
    pub const fn column(&self) -> Option<&Arc<Column>> {
        self.column.as_ref()
    }

    /// The calling thread's value, or the default if it bound none.
    #[must_use]
    pub fn value(&self) -> SqlValue {
        self.values
            .read()
            .get(&thread::current().id())
            .cloned()
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// Binds a value for the calling thread only.
    pub fn set_value(&self, value: SqlValue) {
        self.values.write().insert(thread::current().id(), value);
    }

    /// Drops the calling thread's value.
    pub fn clear_value(&self) {
        self.values.write().remove(&thread::current().id());
    }

    /// Whether the calling thread bound a value.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.values.read().contains_key(&thread::current().id())
    }

    /// Number of threads currently holding a value.
    #[must_use]
    pub fn bound_threads(&self) -> usize {
        self.values.read().len()
    }
}

impl fmt::Debug for BindParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindParameter")
            .field("key", &self.key)
            .field("user_defined", &self.user_defined)
            .field("column", &self.column.as_ref().map(|c| c.name.as_str()))
            .field("default_value", &self.default_value)
            .finish_non_exhaustive()
    }
}

/// One `?` of a buffer.
#[derive(Debug, Clone)]
pub struct Placeholder {
    value: SqlValue,
    column: Option<Arc<Column>>,
    parameter: Option<Arc<BindParameter>>,
}

impl Placeholder {
    /// The value to bind right now: the parameter's (thread-scoped) value
    /// if there is a parameter, else the captured value.
    #[must_use]
    pub fn value(&self) -> SqlValue {
        match &self.parameter {
            Some(param) => param.value(),
            None => self.value.clone(),
        }
    }

    #[must_use]
    pub const fn column(&self) -> Option<&Arc<Column>> {
        self.column.as_ref()
    }

    #[must_use]
    pub const fn parameter(&self) -> Option<&Arc<BindParameter>> {
        self.parameter.as_ref()
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Placeholder(Placeholder),
}

/// SQL text interleaved with placeholders.
#[derive(Debug, Clone, Default)]
pub struct SqlBuffer {
    segments: Vec<Segment>,
}

impl SqlBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self { segments: vec![] }
    }

    /// Creates a buffer holding `sql` and no placeholders.
    #[must_use]
    pub fn from_sql(sql: impl AsRef<str>) -> Self {
        let mut buf = Self::new();
        buf.append(sql);
        buf
    }

    /// Appends literal SQL text.
    pub fn append(&mut self, sql: impl AsRef<str>) -> &mut Self {
        let sql = sql.as_ref();
        if sql.is_empty() {
            return self;
        }
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            last.push_str(sql);
        } else {
            self.segments.push(Segment::Text(String::from(sql)));
        }
        self
    }

    /// Appends another buffer, text and placeholders alike.
    pub fn append_buffer(&mut self, other: &Self) -> &mut Self {
        for segment in &other.segments {
            match segment {
                Segment::Text(text) => {
                    self.append(text);
                }
                Segment::Placeholder(p) => self.segments.push(Segment::Placeholder(p.clone())),
            }
        }
        self
    }

    /// Appends a placeholder bound to `value`.
    pub fn append_value(&mut self, value: impl ToSqlValue) -> &mut Self {
        self.push_placeholder(value.to_sql_value(), None, None)
    }

    /// Appends a placeholder for a value destined to `column`; the column
    /// drives type-directed encoding at bind time.
    pub fn append_column_value(&mut self, value: SqlValue, column: Arc<Column>) -> &mut Self {
        self.push_placeholder(value, Some(column), None)
    }

    /// Appends a placeholder whose value comes from `param` at execution.
    pub fn append_parameter(&mut self, param: Arc<BindParameter>) -> &mut Self {
        let column = param.column().cloned();
        let value = param.default_value.clone();
        self.push_placeholder(value, column, Some(param))
    }

    fn push_placeholder(
        &mut self,
        value: SqlValue,
        column: Option<Arc<Column>>,
        parameter: Option<Arc<BindParameter>>,
    ) -> &mut Self {
        self.segments.push(Segment::Placeholder(Placeholder {
            value,
            column,
            parameter,
        }));
        self
    }

    /// Rebinds, for the calling thread, every placeholder associated with
    /// `column`. Fails if none is, or if one of them has no parameter to
    /// rebind.
    pub fn bind(&self, value: impl ToSqlValue, column: &Column) -> Result<()> {
        let value = value.to_sql_value();
        let mut bound = false;
        for p in self.placeholders() {
            let Some(col) = &p.column else { continue };
            if col.name != column.name {
                continue;
            }
            let param = p.parameter.as_ref().ok_or_else(|| {
                Error::Internal(format!(
                    "placeholder for column {} has no bind parameter",
                    column.name
                ))
            })?;
            param.set_value(value.clone());
            bound = true;
        }
        if bound {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "no placeholder is associated with column {}",
                column.name
            )))
        }
    }

    /// Rebinds, for the calling thread, the parameter named `key`.
    pub fn bind_key(&self, key: &str, value: impl ToSqlValue) -> Result<()> {
        let value = value.to_sql_value();
        let mut bound = false;
        for param in self.placeholders().filter_map(Placeholder::parameter) {
            if param.key() == Some(key) {
                param.set_value(value.clone());
                bound = true;
            }
        }
        if bound {
            Ok(())
        } else {
            Err(Error::Internal(format!("no bind parameter named {key}")))
        }
    }

    /// Placeholders in statement order.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(p) => Some(p),
            Segment::Text(_) => None,
        })
    }

    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.placeholders().count()
    }

    /// Current values of all placeholders, in statement order.
    #[must_use]
    pub fn parameters(&self) -> Vec<SqlValue> {
        self.placeholders().map(Placeholder::value).collect()
    }

    /// Drops every value the calling thread bound on this buffer's
    /// parameters.
    pub fn clear_bindings(&self) {
        for param in self.placeholders().filter_map(Placeholder::parameter) {
            param.clear_value();
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The SQL text with `?` placeholders.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Placeholder(_) => sql.push('?'),
            }
        }
        sql
    }

    /// The SQL text with values rendered inline. For logs only.
    #[must_use]
    pub fn to_inline_sql(&self) -> String {
        let mut sql = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Placeholder(p) => sql.push_str(&p.value().to_sql_inline()),
            }
        }
        sql
    }
}

impl fmt::Display for SqlBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// An operand of a generated function call: either a number known while
/// generating, or an arbitrary SQL expression.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Number(i64),
    Sql(SqlBuffer),
}

impl FilterValue {
    /// A SQL expression without placeholders, e.g. a column reference.
    #[must_use]
    pub fn expr(sql: impl AsRef<str>) -> Self {
        Self::Sql(SqlBuffer::from_sql(sql))
    }

    /// A placeholder bound to `value`.
    #[must_use]
    pub fn param(value: impl ToSqlValue) -> Self {
        let mut buf = SqlBuffer::new();
        buf.append_value(value);
        Self::Sql(buf)
    }

    /// Appends the operand.
    pub fn append_to(&self, buf: &mut SqlBuffer) {
        match self {
            Self::Number(n) => {
                buf.append(n.to_string());
            }
            Self::Sql(sql) => {
                buf.append_buffer(sql);
            }
        }
    }

    /// Appends the operand shifted by `offset`, folding numbers whose sum
    /// fits an `i64`.
    pub fn append_plus(&self, buf: &mut SqlBuffer, offset: i64) {
        match self {
            Self::Number(n) => match n.checked_add(offset) {
                Some(sum) => {
                    buf.append(sum.to_string());
                }
                None => append_shifted(buf, &SqlBuffer::from_sql(n.to_string()), offset),
            },
            Self::Sql(sql) if offset == 0 => {
                buf.append_buffer(sql);
            }
            Self::Sql(sql) => append_shifted(buf, sql, offset),
        }
    }

    /// Appends `end - start`, folding numbers whose difference fits an
    /// `i64`.
    pub fn append_difference(end: &Self, start: &Self, buf: &mut SqlBuffer) {
        if let (Self::Number(e), Self::Number(s)) = (end, start) {
            if let Some(diff) = e.checked_sub(*s) {
                buf.append(diff.to_string());
                return;
            }
        }
        buf.append("(");
        end.append_to(buf);
        buf.append(" - ");
        start.append_to(buf);
        buf.append(")");
    }
}

/// `(operand + n)` or `(operand - n)`.
fn append_shifted(buf: &mut SqlBuffer, operand: &SqlBuffer, offset: i64) {
    let op = if offset < 0 { '-' } else { '+' };
    buf.append("(")
        .append_buffer(operand)
        .append(format!(" {op} {})", offset.unsigned_abs()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn name_column() -> Arc<Column> {
        Arc::new(Column::new("NAME", ColumnType::Varchar))
    }

    #[test]
    fn test_placeholders_match_question_marks() {
        let mut buf = SqlBuffer::new();
        buf.append("SELECT * FROM T WHERE A = ")
            .append_value(1)
            .append(" AND B = ")
            .append_value("x");
        assert_eq!(buf.to_sql(), "SELECT * FROM T WHERE A = ? AND B = ?");
        assert_eq!(buf.placeholder_count(), 2);
        assert_eq!(
            buf.parameters(),
            vec![SqlValue::Int(1), SqlValue::Text(String::from("x"))]
        );
        assert_eq!(buf.to_inline_sql(), "SELECT * FROM T WHERE A = 1 AND B = 'x'");
    }

    #[test]
    fn test_nested_buffer_keeps_parameter_order() {
        let mut inner = SqlBuffer::new();
        inner.append("B = ").append_value(2);
        let mut outer = SqlBuffer::new();
        outer
            .append("A = ")
            .append_value(1)
            .append(" AND ")
            .append_buffer(&inner)
            .append(" AND C = ")
            .append_value(3);
        assert_eq!(outer.to_sql(), "A = ? AND B = ? AND C = ?");
        assert_eq!(
            outer.parameters(),
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_bind_by_column_rebinds_without_changing_text() {
        let column = name_column();
        let param = Arc::new(BindParameter::system(Some(Arc::clone(&column)), SqlValue::Null));
        let mut buf = SqlBuffer::new();
        buf.append("NAME = ").append_parameter(param);
        let sql = buf.to_sql();

        buf.bind("alice", &column).unwrap();
        assert_eq!(buf.parameters(), vec![SqlValue::Text(String::from("alice"))]);
        assert_eq!(buf.to_sql(), sql);
    }

    #[test]
    fn test_bind_fails_without_parameter() {
        let column = name_column();
        let mut buf = SqlBuffer::new();
        buf.append("NAME = ")
            .append_column_value(SqlValue::Text(String::from("bob")), Arc::clone(&column));
        assert!(matches!(buf.bind("x", &column), Err(Error::Internal(_))));

        let other = Column::new("OTHER", ColumnType::Integer);
        assert!(buf.bind(1, &other).is_err());
    }

    #[test]
    fn test_bind_key() {
        let param = Arc::new(BindParameter::user("minAge", SqlValue::Null));
        let mut buf = SqlBuffer::new();
        buf.append("AGE > ").append_parameter(param);
        buf.bind_key("minAge", 18).unwrap();
        assert_eq!(buf.parameters(), vec![SqlValue::Int(18)]);
        assert!(buf.bind_key("maxAge", 1).is_err());
    }

    #[test]
    fn test_user_parameter_requires_key() {
        assert!(BindParameter::new(None, true, None, SqlValue::Null).is_err());
        let param = BindParameter::new(None, false, None, SqlValue::Null).unwrap();
        assert!(!param.is_user_defined());
        assert_eq!(param.key(), None);
    }

    #[test]
    fn test_values_are_thread_scoped() {
        let param = Arc::new(BindParameter::user("p", SqlValue::Int(0)));
        param.set_value(SqlValue::Int(1));

        let other = Arc::clone(&param);
        let seen = thread::spawn(move || {
            let before = other.value();
            other.set_value(SqlValue::Int(2));
            (before, other.value())
        })
        .join()
        .unwrap();

        assert_eq!(seen, (SqlValue::Int(0), SqlValue::Int(2)));
        assert_eq!(param.value(), SqlValue::Int(1));
        param.clear_value();
        assert!(!param.is_bound());
        assert_eq!(param.value(), SqlValue::Int(0));
    }

    #[test]
    fn test_filter_value_arithmetic() {
        let mut buf = SqlBuffer::new();
        FilterValue::Number(4).append_plus(&mut buf, 1);
        buf.append(", ");
        FilterValue::expr("t0.START").append_plus(&mut buf, 1);
        buf.append(", ");
        FilterValue::append_difference(&FilterValue::Number(9), &FilterValue::Number(4), &mut buf);
        buf.append(", ");
        FilterValue::append_difference(
            &FilterValue::expr("t0.END"),
            &FilterValue::Number(4),
            &mut buf,
        );
        assert_eq!(buf.to_sql(), "5, (t0.START + 1), 5, (t0.END - 4)");
    }

    #[test]
    fn test_filter_value_arithmetic_at_the_bounds() {
        let mut buf = SqlBuffer::new();
        FilterValue::Number(i64::MAX).append_plus(&mut buf, 1);
        buf.append(", ");
        FilterValue::Number(0).append_plus(&mut buf, i64::MIN);
        buf.append(", ");
        FilterValue::expr("t0.START").append_plus(&mut buf, i64::MIN);
        buf.append(", ");
        FilterValue::append_difference(
            &FilterValue::Number(i64::MAX),
            &FilterValue::Number(-1),
            &mut buf,
        );
        assert_eq!(
            buf.to_sql(),
            "(9223372036854775807 + 1), -9223372036854775808, \
             (t0.START - 9223372036854775808), (9223372036854775807 - -1)"
        );
    }

    #[test]
    fn test_clear_bindings_releases_thread_slots() {
        let param = Arc::new(BindParameter::user("p", SqlValue::Null));
        let mut buf = SqlBuffer::new();
        buf.append("A = ").append_parameter(Arc::clone(&param));

        thread::scope(|scope| {
            for i in 0..16 {
                let buf = &buf;
                scope.spawn(move || {
                    buf.bind_key("p", i).unwrap();
                    buf.clear_bindings();
                });
            }
        });
        assert_eq!(param.bound_threads(), 0);
    }
}
