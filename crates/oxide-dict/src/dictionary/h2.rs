//! H2.

use super::{base, DBDictionary};
use crate::buffer::{FilterValue, SqlBuffer};
use crate::error::Result;
use crate::schema::{ColumnMetadata, ColumnType};

const RESERVED: &[&str] = &[
    "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "EXCEPT", "INTERSECTS", "LIMIT",
    "MINUS", "OFFSET", "QUALIFY", "ROWNUM", "SYSDATE", "SYSTIME", "SYSTIMESTAMP", "TODAY",
];

pub(crate) fn dictionary() -> DBDictionary {
    let mut dict = DBDictionary::base();
    dict.platform = String::from("H2");
    dict.add_reserved_words(RESERVED);
    dict.auto_assign_clause = Some(String::from("AUTO_INCREMENT"));

    let types = &mut dict.types;
    types.bit = String::from("BOOLEAN");
    types.longvarchar = String::from("VARCHAR");
    types.longvarbinary = String::from("LONGVARBINARY");
    types.other = String::from("OTHER");

    dict.capabilities.supports_deferred_constraints = false;
    dict.capabilities.supports_cascade_update_action = true;
    dict.capabilities.supports_null_update_action = true;
    dict.capabilities.supports_default_update_action = true;

    dict.error_codes = dict
        .error_codes
        .clone()
        .extend(&["HYT00", "40001"], &["57014"], &[]);

    let gen = &mut dict.generators;
    gen.index_of = index_of;
    gen.normalize_metadata = normalize_metadata;
    gen.jdbc_type = jdbc_type;
    dict
}

/// `(LOCATE(needle, haystack[, from + 1]) - 1)`.
fn index_of(
    _dict: &DBDictionary,
    buf: &mut SqlBuffer,
    haystack: &FilterValue,
    needle: &FilterValue,
    from: Option<&FilterValue>,
) -> Result<()> {
    base::locate_call(buf, "LOCATE", needle, haystack, from);
    Ok(())
}

/// Some H2 versions report CLOB columns with the VARCHAR code; the type
/// name is authoritative.
fn normalize_metadata(_dict: &DBDictionary, mut meta: ColumnMetadata) -> ColumnMetadata {
    let name = meta.type_name.to_ascii_uppercase();
    if name == "CLOB" || name == "CHARACTER LARGE OBJECT" {
        meta.data_type = ColumnType::Clob.jdbc_code();
    } else if name == "BLOB" || name == "BINARY LARGE OBJECT" {
        meta.data_type = ColumnType::Blob.jdbc_code();
    }
    meta
}

fn jdbc_type(_dict: &DBDictionary, code: i32, name: &str, _size: Option<u32>) -> ColumnType {
    match ColumnType::from_jdbc_code(code) {
        ColumnType::Varchar if name.eq_ignore_ascii_case("CLOB") => ColumnType::Clob,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clob_reported_as_varchar() {
        let dict = dictionary();
        let meta = ColumnMetadata {
            table_name: String::from("DOC"),
            column_name: String::from("BODY"),
            data_type: ColumnType::Varchar.jdbc_code(),
            type_name: String::from("CLOB"),
            ..ColumnMetadata::default()
        };
        let columns = dict.get_columns(vec![meta], None, Some("doc"));
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].column_type, ColumnType::Clob);
    }

    #[test]
    fn test_locate_with_from() {
        let dict = dictionary();
        let mut buf = SqlBuffer::new();
        dict.index_of(
            &mut buf,
            &FilterValue::expr("t0.S"),
            &FilterValue::expr("'b'"),
            Some(&FilterValue::Number(3)),
        )
        .unwrap();
        assert_eq!(buf.to_sql(), "(LOCATE('b', t0.S, 4) - 1)");
    }
}
