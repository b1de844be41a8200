mod common;

use std::sync::Arc;
use std::thread;

use common::dictionary;
use oxide_dict::{BindParameter, Column, ColumnType, SqlBuffer, SqlValue};

const ITERATIONS: usize = 100;

fn cached_statement() -> SqlBuffer {
    let mut buf = SqlBuffer::from_sql("SELECT t0.ID FROM BOOK t0 WHERE t0.TITLE = ");
    buf.append_parameter(Arc::new(BindParameter::user("title", SqlValue::Null)));
    buf
}

#[test]
fn test_threads_never_see_each_others_values() {
    let buf = cached_statement();
    let dict = dictionary("generic");

    thread::scope(|scope| {
        for worker in ["x", "y"] {
            let buf = &buf;
            let dict = &dict;
            scope.spawn(move || {
                for i in 0..ITERATIONS {
                    let mine = format!("{worker}-{i}");
                    buf.bind_key("title", mine.as_str()).unwrap();
                    thread::yield_now();
                    let params = dict.bind_parameters(buf).unwrap();
                    assert_eq!(params, [SqlValue::Text(mine)]);
                }
            });
        }
    });

    // The spawning thread never bound anything.
    assert_eq!(buf.parameters(), [SqlValue::Null]);
    assert_eq!(bound_threads(&buf), 0);
}

fn bound_threads(buf: &SqlBuffer) -> usize {
    buf.placeholders()
        .filter_map(|p| p.parameter())
        .map(|param| param.bound_threads())
        .sum()
}

#[test]
fn test_short_lived_threads_leave_no_bindings_behind() {
    let buf = cached_statement();
    let dict = dictionary("generic");
    for i in 0..200 {
        thread::scope(|scope| {
            scope.spawn(|| {
                buf.bind_key("title", format!("t{i}").as_str()).unwrap();
                dict.bind_parameters(&buf).unwrap();
            });
        });
    }
    assert_eq!(bound_threads(&buf), 0);
}

#[test]
fn test_execution_consumes_the_binding() {
    let buf = cached_statement();
    let dict = dictionary("generic");
    buf.bind_key("title", "Dune").unwrap();
    assert_eq!(
        dict.bind_parameters(&buf).unwrap(),
        [SqlValue::Text(String::from("Dune"))]
    );
    assert_eq!(dict.bind_parameters(&buf).unwrap(), [SqlValue::Null]);
}

#[test]
fn test_rebinding_by_column_keeps_the_text() {
    let title = Arc::new(Column::new("TITLE", ColumnType::Varchar));
    let mut buf = SqlBuffer::from_sql("UPDATE BOOK SET TITLE = ");
    buf.append_parameter(Arc::new(BindParameter::system(
        Some(Arc::clone(&title)),
        SqlValue::Null,
    )));
    let sql = buf.to_sql();

    buf.bind("Dune", &title).unwrap();
    assert_eq!(buf.to_sql(), sql);
    assert_eq!(buf.parameters(), [SqlValue::Text(String::from("Dune"))]);

    let other = Column::new("AUTHOR", ColumnType::Varchar);
    assert!(buf.bind("x", &other).is_err());
}
