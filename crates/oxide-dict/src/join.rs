//! Joins between two aliased tables.
//!
//! A join is an undirected edge: `Join(a, b)` and `Join(b, a)` are equal and
//! hash alike, so planners can deduplicate joins found from either side.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::buffer::SqlBuffer;
use crate::schema::{ForeignKey, Table};

/// Kind of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Outer,
    Cross,
}

/// How joins are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSyntax {
    /// `A t0 INNER JOIN B t1 ON (...)`.
    #[default]
    Sql92,
    /// `A t0, B t1 WHERE ...`.
    Traditional,
    /// Whatever the database offers natively for outer joins.
    Database,
}

/// One side of a join.
#[derive(Debug, Clone)]
pub struct JoinEnd {
    pub table: Arc<Table>,
    pub alias: String,
}

/// A join of two aliased tables through a foreign key.
///
/// When `inverse` is false the foreign key is declared on the first table and
/// references the second; when true it is declared on the second.
#[derive(Debug, Clone)]
pub struct Join {
    first: JoinEnd,
    second: JoinEnd,
    foreign_key: Option<Arc<ForeignKey>>,
    inverse: bool,
    join_type: JoinType,
}

impl Join {
    #[must_use]
    pub fn new(
        table1: Arc<Table>,
        alias1: impl Into<String>,
        table2: Arc<Table>,
        alias2: impl Into<String>,
        foreign_key: Option<Arc<ForeignKey>>,
        inverse: bool,
    ) -> Self {
        Self {
            first: JoinEnd {
                table: table1,
                alias: alias1.into(),
            },
            second: JoinEnd {
                table: table2,
                alias: alias2.into(),
            },
            foreign_key,
            inverse,
            join_type: JoinType::Inner,
        }
    }

    /// A cross join, which has no join condition.
    #[must_use]
    pub fn cross(
        table1: Arc<Table>,
        alias1: impl Into<String>,
        table2: Arc<Table>,
        alias2: impl Into<String>,
    ) -> Self {
        Self::new(table1, alias1, table2, alias2, None, false).with_type(JoinType::Cross)
    }

    #[must_use]
    pub const fn with_type(mut self, join_type: JoinType) -> Self {
        self.join_type = join_type;
        self
    }

    #[must_use]
    pub const fn first(&self) -> &JoinEnd {
        &self.first
    }

    #[must_use]
    pub const fn second(&self) -> &JoinEnd {
        &self.second
    }

    #[must_use]
    pub const fn foreign_key(&self) -> Option<&Arc<ForeignKey>> {
        self.foreign_key.as_ref()
    }

    #[must_use]
    pub const fn is_inverse(&self) -> bool {
        self.inverse
    }

    #[must_use]
    pub const fn join_type(&self) -> JoinType {
        self.join_type
    }

    /// The same join seen from the other side.
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self {
            first: self.second.clone(),
            second: self.first.clone(),
            foreign_key: self.foreign_key.clone(),
            inverse: !self.inverse,
            join_type: self.join_type,
        }
    }

    /// Whether following the join can yield several rows per row of the
    /// first table (the foreign key points back at it).
    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.join_type != JoinType::Cross && self.inverse
    }

    /// Appends the join condition, `(t0.A = t1.B AND ...)`. Cross joins
    /// append nothing.
    pub fn append_condition(&self, buf: &mut SqlBuffer) {
        let Some(fk) = &self.foreign_key else {
            return;
        };
        buf.append("(");
        for (i, (local, referenced)) in fk.column_pairs().enumerate() {
            if i > 0 {
                buf.append(" AND ");
            }
            // The side that owns the foreign key contributes its local column.
            let (left, right) = if self.inverse {
                (referenced, local)
            } else {
                (local, referenced)
            };
            buf.append(format!(
                "{}.{left} = {}.{right}",
                self.first.alias, self.second.alias
            ));
        }
        buf.append(")");
    }
}

impl PartialEq for Join {
    fn eq(&self, other: &Self) -> bool {
        (self.first.alias == other.first.alias && self.second.alias == other.second.alias)
            || (self.first.alias == other.second.alias && self.second.alias == other.first.alias)
    }
}

impl Eq for Join {}

impl Hash for Join {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (a, b) = if self.first.alias <= self.second.alias {
            (&self.first.alias, &self.second.alias)
        } else {
            (&self.second.alias, &self.first.alias)
        };
        a.hash(state);
        b.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::schema::{Column, ColumnType};

    fn tables() -> (Arc<Table>, Arc<Table>, Arc<ForeignKey>) {
        let author = Arc::new(
            Table::new("AUTHOR").column(Column::new("ID", ColumnType::Integer)),
        );
        let book = Arc::new(
            Table::new("BOOK")
                .column(Column::new("ID", ColumnType::Integer))
                .column(Column::new("AUTHOR_ID", ColumnType::Integer)),
        );
        let fk = Arc::new(ForeignKey::new(None, &["AUTHOR_ID"], "AUTHOR", &["ID"]));
        (author, book, fk)
    }

    #[test]
    fn test_double_reverse_is_identity() {
        let (author, book, fk) = tables();
        let join = Join::new(book, "t0", author, "t1", Some(fk), false);
        let back = join.reverse().reverse();
        assert_eq!(back, join);
        assert_eq!(back.first().alias, "t0");
        assert!(!back.is_inverse());
    }

    #[test]
    fn test_equality_is_symmetric_regardless_of_inverse() {
        let (author, book, fk) = tables();
        let ab = Join::new(Arc::clone(&book), "t0", Arc::clone(&author), "t1", Some(Arc::clone(&fk)), false);
        let ba = Join::new(author, "t1", book, "t0", Some(fk), false);
        assert_eq!(ab, ba);
        assert_eq!(ab, ab.reverse());

        let mut set = HashSet::new();
        set.insert(ab.clone());
        assert!(!set.insert(ba));
        assert!(!set.insert(ab.reverse()));
    }

    #[test]
    fn test_reverse_preserves_type_and_toggles_inverse() {
        let (author, book, fk) = tables();
        let join = Join::new(book, "t0", author, "t1", Some(fk), false).with_type(JoinType::Outer);
        let rev = join.reverse();
        assert_eq!(rev.join_type(), JoinType::Outer);
        assert!(rev.is_inverse());
        assert_eq!(rev.first().alias, "t1");
        assert_eq!(rev.second().table.name, "BOOK");
    }

    #[test]
    fn test_condition_follows_direction() {
        let (author, book, fk) = tables();
        let join = Join::new(book, "t0", author, "t1", Some(fk), false);
        let mut buf = SqlBuffer::new();
        join.append_condition(&mut buf);
        assert_eq!(buf.to_sql(), "(t0.AUTHOR_ID = t1.ID)");

        let mut buf = SqlBuffer::new();
        join.reverse().append_condition(&mut buf);
        assert_eq!(buf.to_sql(), "(t1.ID = t0.AUTHOR_ID)");
        assert!(join.reverse().is_to_many());
    }

    #[test]
    fn test_cross_join_has_no_condition() {
        let (author, book, _) = tables();
        let join = Join::cross(author, "t0", book, "t1");
        let mut buf = SqlBuffer::new();
        join.append_condition(&mut buf);
        assert!(buf.is_empty());
        assert!(!join.is_to_many());
    }
}
