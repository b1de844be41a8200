#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use oxide_dict::driver::{NativeResult, QueryOptions};
use oxide_dict::{
    Connection, DBDictionary, DictionaryFactory, DriverMetadata, ResultSet, SqlError, SqlValue,
    VecResultSet,
};

/// One dictionary per supported platform, in list order.
pub fn all_dictionaries() -> Vec<(&'static str, DBDictionary)> {
    let factory = DictionaryFactory::new();
    DictionaryFactory::list()
        .into_iter()
        .map(|name| {
            let dict = factory
                .for_name(name)
                .unwrap_or_else(|e| panic!("Failed to build {name}: {e}"));
            (name, dict)
        })
        .collect()
}

pub fn dictionary(name: &str) -> DBDictionary {
    DictionaryFactory::new()
        .for_name(name)
        .unwrap_or_else(|e| panic!("Failed to build {name}: {e}"))
}

pub fn metadata(product: &str, major: u32, minor: u32) -> DriverMetadata {
    DriverMetadata {
        database_product_name: String::from(product),
        database_product_version: format!("{major}.{minor}"),
        database_major_version: major,
        database_minor_version: minor,
        driver_name: String::from("mock"),
        ..DriverMetadata::default()
    }
}

/// A statement the mock saw.
#[derive(Debug, Clone)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub options: Option<QueryOptions>,
}

/// Scripted connection. Queries pop result sets from `results` (an empty
/// set once exhausted); statements return `affected`.
#[derive(Default)]
pub struct MockConnection {
    pub meta: DriverMetadata,
    pub results: VecDeque<Vec<Vec<SqlValue>>>,
    pub affected: u64,
    pub failure: Option<Arc<SqlError>>,
    pub log: Vec<Executed>,
}

impl MockConnection {
    pub fn new(meta: DriverMetadata) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub fn with_result(mut self, rows: Vec<Vec<SqlValue>>) -> Self {
        self.results.push_back(rows);
        self
    }

    pub fn sql(&self) -> Vec<&str> {
        self.log.iter().map(|e| e.sql.as_str()).collect()
    }
}

impl Connection for MockConnection {
    fn metadata(&self) -> NativeResult<DriverMetadata> {
        Ok(self.meta.clone())
    }

    fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        options: &QueryOptions,
    ) -> NativeResult<Box<dyn ResultSet>> {
        if let Some(err) = &self.failure {
            return Err(Arc::clone(err));
        }
        self.log.push(Executed {
            sql: String::from(sql),
            params: params.to_vec(),
            options: Some(*options),
        });
        let rows = self.results.pop_front().unwrap_or_default();
        Ok(Box::new(VecResultSet::new(vec![String::from("C0")], rows)))
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> NativeResult<u64> {
        if let Some(err) = &self.failure {
            return Err(Arc::clone(err));
        }
        self.log.push(Executed {
            sql: String::from(sql),
            params: params.to_vec(),
            options: None,
        });
        Ok(self.affected)
    }
}

pub fn ints(values: &[i64]) -> Vec<Vec<SqlValue>> {
    values.iter().map(|v| vec![SqlValue::Int(*v)]).collect()
}

pub fn drain(mut rs: Box<dyn ResultSet>) -> Vec<i64> {
    let mut out = vec![];
    while let Some(row) = rs.next_row().unwrap() {
        out.push(row[0].as_i64().unwrap());
    }
    out
}

/// Evaluates a substring call over a quoted literal, as the database would:
/// 1-based start, optional character count.
///
/// Understands `F(s, a[, n])` for any function name, `SUBSTRING(s FROM a
/// [FOR n])`, and `LEN(s)` / `LENGTH(s)` as the count.
pub fn eval_substring(sql: &str) -> String {
    let open = sql
        .find('(')
        .unwrap_or_else(|| panic!("Not a call: {sql}"));
    let inner = sql[open + 1..]
        .strip_suffix(')')
        .unwrap_or_else(|| panic!("Unbalanced call: {sql}"));

    let (source, start, count) = if let Some((source, rest)) = inner.split_once(" FROM ") {
        match rest.split_once(" FOR ") {
            Some((start, count)) => (source, start, Some(count)),
            None => (source, rest, None),
        }
    } else {
        let parts: Vec<&str> = inner.splitn(3, ", ").collect();
        match parts.as_slice() {
            [source, start] => (*source, *start, None),
            [source, start, count] => (*source, *start, Some(*count)),
            _ => panic!("Unexpected arguments: {sql}"),
        }
    };

    let text = literal(source);
    let chars: Vec<char> = text.chars().collect();
    let start: usize = start.trim().parse().unwrap_or_else(|_| panic!("Bad start in {sql}"));
    let count = match count.map(str::trim) {
        None => chars.len(),
        Some(c) if c.starts_with("LEN(") || c.starts_with("LENGTH(") => {
            let arg = &c[c.find('(').unwrap() + 1..c.len() - 1];
            literal(arg).chars().count()
        }
        Some(c) => c.parse().unwrap_or_else(|_| panic!("Bad count in {sql}")),
    };
    chars.iter().skip(start - 1).take(count).collect()
}

fn literal(sql: &str) -> String {
    sql.trim()
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or_else(|| panic!("Not a string literal: {sql}"))
        .replace("''", "'")
}
