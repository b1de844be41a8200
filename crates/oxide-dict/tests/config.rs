mod common;

use std::sync::Arc;

use oxide_dict::boolean::{IntBoolean, BUILTIN_KEYS};
use oxide_dict::{
    BooleanRepresentationFactory, Column, ColumnType, DictionaryConfig, DictionaryFactory, Error,
    SqlValue, Table,
};

#[test]
fn test_string_yn_round_trips() {
    let yn = BooleanRepresentationFactory::new().value_of("STRING_YN").unwrap();
    for value in [true, false] {
        assert_eq!(yn.get_boolean(&yn.set_boolean(value)).unwrap(), value);
    }
}

#[test]
fn test_unknown_boolean_key_lists_builtins() {
    let err = BooleanRepresentationFactory::new()
        .value_of("unknown-key")
        .unwrap_err();
    let Error::Configuration(message) = err else {
        panic!("expected a configuration error");
    };
    for key in BUILTIN_KEYS {
        assert!(message.contains(key), "{key} missing from: {message}");
    }
}

#[test]
fn test_registered_boolean_is_usable_from_config() {
    let booleans = BooleanRepresentationFactory::new()
        .register("MINUS_ONE", || Arc::new(IntBoolean::new(-1, 0)));
    let factory = DictionaryFactory::new().with_booleans(booleans);
    let config = DictionaryConfig::from_json_str(
        r#"{"url": "jdbc:h2:mem:test", "boolean_representation": "MINUS_ONE"}"#,
    )
    .unwrap();
    let dict = config.build(&factory).unwrap();
    assert_eq!(
        dict.bind_value(SqlValue::Bool(true), None).unwrap(),
        SqlValue::Int(-1)
    );
    // The storage type follows the representation.
    let flag = Column::new("ACTIVE", ColumnType::Boolean);
    assert_eq!(dict.type_name(&flag), dict.types.smallint);
}

#[test]
fn test_name_limits_drive_identifier_validation() {
    let config = DictionaryConfig::from_json_str(
        r#"{"platform": "derby", "max_column_name_length": 8, "reserved_words": ["ISBN"]}"#,
    )
    .unwrap();
    let dict = config.build(&DictionaryFactory::new()).unwrap();
    let taken = std::collections::HashSet::new();
    assert!(dict.valid_column_name("PUBLICATION_DATE", &taken).len() <= 8);
    assert_ne!(dict.valid_column_name("ISBN", &taken), "ISBN");
}

#[test]
fn test_table_type_reaches_ddl() {
    let config =
        DictionaryConfig::from_json_str(r#"{"platform": "mariadb", "table_type": "aria"}"#).unwrap();
    let dict = config.build(&DictionaryFactory::new()).unwrap();
    let table = Table::new("BOOK").column(Column::new("ID", ColumnType::Integer));
    let ddl = dict.create_table_sql(&table);
    assert_eq!(ddl.len(), 1);
    assert!(ddl[0].ends_with("ENGINE = aria"), "{}", ddl[0]);
}
