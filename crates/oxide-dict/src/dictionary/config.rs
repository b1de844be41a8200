//! JSON configuration of a dictionary.
//!
//! ```json
//! {
//!   "platform": "mysql",
//!   "boolean_representation": "STRING_YN",
//!   "max_column_name_length": 30,
//!   "reserved_words": ["TENANT"],
//!   "capabilities": { "supports_subselect": false }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Capabilities, DBDictionary, DictionaryFactory, RangePosition};
use crate::error::{Error, Result};
use crate::join::JoinSyntax;

/// Selects a dictionary and overrides parts of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DictionaryConfig {
    /// Platform name or alias. Takes precedence over `url`.
    pub platform: Option<String>,
    /// Connection URL the platform is derived from.
    pub url: Option<String>,
    /// Boolean representation key, see [`crate::boolean`].
    pub boolean_representation: Option<String>,
    pub join_syntax: Option<JoinSyntax>,
    pub range_position: Option<RangePosition>,
    /// Added to the dialect's reserved words.
    pub reserved_words: Vec<String>,
    pub max_table_name_length: Option<usize>,
    pub max_column_name_length: Option<usize>,
    pub max_constraint_name_length: Option<usize>,
    pub max_index_name_length: Option<usize>,
    pub table_type: Option<String>,
    pub for_update_clause: Option<String>,
    pub large_fetch_size: Option<u32>,
    /// Capability flags by field name, e.g. `supports_subselect`.
    pub capabilities: BTreeMap<String, bool>,
}

impl DictionaryConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Builds the configured dictionary. All keys are validated here, so a
    /// bad configuration fails before any statement is generated.
    pub fn build(&self, factory: &DictionaryFactory) -> Result<DBDictionary> {
        let mut dict = match (&self.platform, &self.url) {
            (Some(name), _) => factory.for_name(name)?,
            (None, Some(url)) => factory.for_url(url)?,
            (None, None) => {
                return Err(Error::Configuration(String::from(
                    "either \"platform\" or \"url\" must be set",
                )))
            }
        };

        if let Some(key) = &self.boolean_representation {
            dict.boolean_representation = factory.boolean_representation(key)?;
        }
        if let Some(syntax) = self.join_syntax {
            dict.default_join_syntax = syntax;
        }
        if let Some(position) = self.range_position {
            dict.capabilities.range_position = position;
        }
        let words: Vec<&str> = self.reserved_words.iter().map(String::as_str).collect();
        dict.add_reserved_words(&words);

        let limits = &mut dict.limits;
        for (value, slot) in [
            (self.max_table_name_length, &mut limits.max_table_name_length),
            (self.max_column_name_length, &mut limits.max_column_name_length),
            (self.max_constraint_name_length, &mut limits.max_constraint_name_length),
            (self.max_index_name_length, &mut limits.max_index_name_length),
        ] {
            match value {
                Some(0) => {
                    return Err(Error::Configuration(String::from(
                        "identifier length limits must be positive",
                    )))
                }
                Some(n) => *slot = n,
                None => {}
            }
        }

        if self.table_type.is_some() {
            dict.table_type.clone_from(&self.table_type);
        }
        if self.for_update_clause.is_some() {
            dict.for_update_clause.clone_from(&self.for_update_clause);
        }
        if self.large_fetch_size.is_some() {
            dict.large_fetch_size = self.large_fetch_size;
        }

        for (name, value) in &self.capabilities {
            let flag = capability_flag(&mut dict.capabilities, name).ok_or_else(|| {
                Error::Configuration(format!("unknown capability \"{name}\""))
            })?;
            *flag = *value;
        }

        debug!(platform = %dict.platform, "dictionary configured");
        Ok(dict)
    }
}

fn capability_flag<'a>(caps: &'a mut Capabilities, name: &str) -> Option<&'a mut bool> {
    let flag = match name {
        "supports_subselect" => &mut caps.supports_subselect,
        "supports_correlated_subselect" => &mut caps.supports_correlated_subselect,
        "requires_alias_for_subselect" => &mut caps.requires_alias_for_subselect,
        "supports_select_start_index" => &mut caps.supports_select_start_index,
        "supports_select_end_index" => &mut caps.supports_select_end_index,
        "supports_select_for_update" => &mut caps.supports_select_for_update,
        "supports_lock_with_distinct" => &mut caps.supports_lock_with_distinct,
        "supports_lock_with_outer_join" => &mut caps.supports_lock_with_outer_join,
        "supports_lock_with_multiple_tables" => &mut caps.supports_lock_with_multiple_tables,
        "supports_lock_with_order_by" => &mut caps.supports_lock_with_order_by,
        "supports_lock_with_select_range" => &mut caps.supports_lock_with_select_range,
        "supports_query_timeout" => &mut caps.supports_query_timeout,
        "supports_scrollable_result_sets" => &mut caps.supports_scrollable_result_sets,
        "supports_multiple_nontransactional_result_sets" => {
            &mut caps.supports_multiple_nontransactional_result_sets
        }
        "supports_union" => &mut caps.supports_union,
        "supports_having" => &mut caps.supports_having,
        "supports_index_of" => &mut caps.supports_index_of,
        "supports_foreign_keys" => &mut caps.supports_foreign_keys,
        "supports_deferred_constraints" => &mut caps.supports_deferred_constraints,
        "supports_unique_constraints" => &mut caps.supports_unique_constraints,
        "supports_null_unique_columns" => &mut caps.supports_null_unique_columns,
        "supports_alter_primary_key" => &mut caps.supports_alter_primary_key,
        "supports_restrict_delete_action" => &mut caps.supports_restrict_delete_action,
        "supports_cascade_delete_action" => &mut caps.supports_cascade_delete_action,
        "supports_null_delete_action" => &mut caps.supports_null_delete_action,
        "supports_default_delete_action" => &mut caps.supports_default_delete_action,
        "supports_restrict_update_action" => &mut caps.supports_restrict_update_action,
        "supports_cascade_update_action" => &mut caps.supports_cascade_update_action,
        "supports_null_update_action" => &mut caps.supports_null_update_action,
        "supports_default_update_action" => &mut caps.supports_default_update_action,
        "supports_auto_assign" => &mut caps.supports_auto_assign,
        "supports_alter_table_with_add_column" => &mut caps.supports_alter_table_with_add_column,
        "supports_alter_table_with_drop_column" => &mut caps.supports_alter_table_with_drop_column,
        "supports_timestamp_nanos" => &mut caps.supports_timestamp_nanos,
        "use_schema_name" => &mut caps.use_schema_name,
        "store_large_numbers_as_strings" => &mut caps.store_large_numbers_as_strings,
        _ => return None,
    };
    Some(flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlValue;

    #[test]
    fn test_overrides_are_applied() {
        let config = DictionaryConfig::from_json_str(
            r#"{
                "platform": "h2",
                "boolean_representation": "STRING_YN",
                "max_column_name_length": 30,
                "reserved_words": ["tenant"],
                "capabilities": { "supports_subselect": false }
            }"#,
        )
        .unwrap();
        let dict = config.build(&DictionaryFactory::new()).unwrap();
        assert_eq!(dict.platform, "H2");
        assert_eq!(dict.limits.max_column_name_length, 30);
        assert!(dict.is_reserved("TENANT"));
        assert!(!dict.capabilities().supports_subselect);
        assert_eq!(
            dict.bind_value(SqlValue::Bool(true), None).unwrap(),
            SqlValue::Text(String::from("Y"))
        );
    }

    #[test]
    fn test_unknown_keys_fail_at_setup() {
        assert!(matches!(
            DictionaryConfig::from_json_str(r#"{"platfrom": "h2"}"#),
            Err(Error::Json(_))
        ));

        let factory = DictionaryFactory::new();
        let bad_flag = DictionaryConfig {
            platform: Some(String::from("h2")),
            capabilities: BTreeMap::from([(String::from("supports_time_travel"), true)]),
            ..DictionaryConfig::default()
        };
        assert!(matches!(bad_flag.build(&factory), Err(Error::Configuration(_))));

        let bad_boolean = DictionaryConfig {
            platform: Some(String::from("h2")),
            boolean_representation: Some(String::from("Y/N/maybe")),
            ..DictionaryConfig::default()
        };
        assert!(matches!(bad_boolean.build(&factory), Err(Error::Configuration(_))));

        assert!(DictionaryConfig::default().build(&factory).is_err());
    }

    #[test]
    fn test_platform_from_url() {
        let config = DictionaryConfig {
            url: Some(String::from("jdbc:firebirdsql://localhost/db")),
            ..DictionaryConfig::default()
        };
        assert_eq!(config.build(&DictionaryFactory::new()).unwrap().platform, "Firebird");
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.json");
        std::fs::write(&path, r#"{"platform": "informix", "range_position": "post_select"}"#).unwrap();
        let dict = DictionaryConfig::from_path(&path)
            .unwrap()
            .build(&DictionaryFactory::new())
            .unwrap();
        assert_eq!(dict.capabilities().range_position, RangePosition::PostSelect);
    }
}
