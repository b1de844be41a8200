//! HerdDB.
//!
//! Primary keys are fixed at creation and foreign keys do not exist, so the
//! corresponding DDL generators produce nothing.

use super::{base, DBDictionary};
use crate::exceptions::{IntegrityViolation, StoreError, StoreErrorKind};
use crate::schema::ColumnMetadata;

const DUPLICATE_KEY_MARKER: &str = "DuplicatePrimaryKey";

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("HerdDB");
    dict.add_reserved_words(&["LIMIT", "OFFSET", "TABLESPACE"]);
    dict.auto_assign_clause = Some(String::from("AUTO_INCREMENT"));

    let types = &mut dict.types;
    types.clob = String::from("STRING");
    types.longvarchar = String::from("STRING");
    types.longvarbinary = String::from("BLOB");

    let caps = &mut dict.capabilities;
    caps.supports_alter_primary_key = false;
    caps.supports_foreign_keys = false;
    caps.supports_deferred_constraints = false;
    caps.supports_unique_constraints = false;
    caps.supports_lock_with_outer_join = false;
    caps.supports_lock_with_distinct = false;

    let gen = &mut dict.generators;
    gen.normalize_metadata = normalize_metadata;
    gen.reclassify = reclassify;
    dict
}

/// The driver reports the tablespace as catalog and leaves the schema empty.
fn normalize_metadata(_dict: &DBDictionary, mut meta: ColumnMetadata) -> ColumnMetadata {
    if meta.table_schema.is_none() {
        std::mem::swap(&mut meta.table_schema, &mut meta.table_catalog);
    }
    meta
}

/// Duplicate keys surface without a SQLSTATE, only in the message.
fn reclassify(dict: &DBDictionary, mut err: StoreError) -> StoreError {
    if err.chain.iter().any(|e| e.message().contains(DUPLICATE_KEY_MARKER)) {
        err.kind = StoreErrorKind::ReferentialIntegrity(IntegrityViolation::UniqueConstraint);
        return err;
    }
    base::reclassify(dict, err)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::exceptions::SqlError;
    use crate::schema::{ForeignKey, PrimaryKey, Table};

    #[test]
    fn test_no_key_ddl() {
        let dict = dictionary();
        let table = Table::new("T");
        assert!(dict
            .add_primary_key_sql(&table, &PrimaryKey::new(Some("PK_T"), &["ID"]))
            .is_empty());
        assert!(dict
            .drop_primary_key_sql(&table, &PrimaryKey::new(Some("PK_T"), &["ID"]))
            .is_empty());
        assert!(dict
            .add_foreign_key_sql(&table, &ForeignKey::new(None, &["A"], "U", &["ID"]))
            .is_empty());
    }

    #[test]
    fn test_tablespace_becomes_schema() {
        let dict = dictionary();
        let meta = ColumnMetadata {
            table_catalog: Some(String::from("herd")),
            table_name: String::from("T"),
            column_name: String::from("ID"),
            data_type: 4,
            ..ColumnMetadata::default()
        };
        let columns = dict.get_columns(vec![meta], Some("HERD"), Some("t"));
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn test_duplicate_key_by_message() {
        let dict = dictionary();
        let err = Arc::new(SqlError::new(
            "herddb.model.DuplicatePrimaryKeyException: key 1 already exists",
        ));
        let store = dict.new_store_exception(String::from("insert failed"), vec![err], None);
        assert_eq!(
            store.kind,
            StoreErrorKind::ReferentialIntegrity(IntegrityViolation::UniqueConstraint)
        );
    }
}
