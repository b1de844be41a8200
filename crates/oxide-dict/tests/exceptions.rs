mod common;

use std::sync::Arc;

use common::dictionary;
use oxide_dict::exceptions::{chain, store_error, IntegrityViolation};
use oxide_dict::{SqlError, StoreErrorKind};

#[test]
fn test_cyclic_chain_normalizes_to_distinct_errors() {
    let e1 = Arc::new(SqlError::new("first").with_sql_state("40001"));
    let e2 = Arc::new(SqlError::new("second"));
    assert!(e1.set_next(Arc::clone(&e2)));
    assert!(e2.set_next(Arc::clone(&e1)));

    let normalized = chain(&e1);
    assert_eq!(normalized.len(), 2);
    assert!(Arc::ptr_eq(&normalized[0], &e1));
    assert!(Arc::ptr_eq(&normalized[1], &e2));

    let err = store_error("update failed", &e1, &dictionary("derby"), None);
    assert_eq!(err.chain.len(), 2);
    assert_eq!(err.kind, StoreErrorKind::Lock);
}

#[test]
fn test_vendor_codes_per_dialect() {
    let cases = [
        ("mysql", 1062, IntegrityViolation::UniqueConstraint),
        ("mysql", 1452, IntegrityViolation::ForeignKey),
        ("sqlserver", 2627, IntegrityViolation::UniqueConstraint),
        ("sqlserver", 515, IntegrityViolation::NotNull),
        ("informix", -268, IntegrityViolation::UniqueConstraint),
        ("hsql", -177, IntegrityViolation::ForeignKey),
        ("firebird", 335_544_466, IntegrityViolation::ForeignKey),
        ("soliddb", 10029, IntegrityViolation::ForeignKey),
    ];
    for (name, code, expected) in cases {
        let native = Arc::new(SqlError::new("constraint violated").with_vendor_code(code));
        let err = store_error("insert failed", &native, &dictionary(name), None);
        assert_eq!(
            err.kind,
            StoreErrorKind::ReferentialIntegrity(expected),
            "{name} {code}"
        );
        assert!(err.has_vendor_code(code));
    }
}

#[test]
fn test_sql_state_anywhere_in_the_chain() {
    let head = Arc::new(SqlError::new("batch failed"));
    let cause = Arc::new(SqlError::new("statement timed out").with_sql_state("57014"));
    head.set_next(Arc::clone(&cause));
    let err = store_error("query failed", &head, &dictionary("h2"), None);
    assert_eq!(err.kind, StoreErrorKind::QueryTimeout);
    assert!(err.has_code("57014"));
}

#[test]
fn test_unknown_failure_is_general() {
    let native = Arc::new(SqlError::new("disk full").with_vendor_code(28));
    let err = store_error("insert failed", &native, &dictionary("derby"), Some(String::from("BOOK 1")));
    assert_eq!(err.kind, StoreErrorKind::General);
    assert_eq!(err.failed.as_deref(), Some("BOOK 1"));
    assert!(err.to_string().contains("insert failed"));
}
