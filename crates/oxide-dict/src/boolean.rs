//! Storage strategies for boolean columns.
//!
//! Databases without a native boolean store flags as numbers or as a pair
//! of strings. A [`BooleanRepresentation`] is picked once per dictionary
//! through [`BooleanRepresentationFactory::value_of`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::{Error, Result};
use crate::schema::ColumnType;
use crate::value::SqlValue;

/// Encodes booleans to their stored form and back.
pub trait BooleanRepresentation: fmt::Debug + Send + Sync {
    /// Value to bind when writing `value`.
    fn set_boolean(&self, value: bool) -> SqlValue;

    /// Decodes a stored value.
    fn get_boolean(&self, stored: &SqlValue) -> Result<bool>;

    /// Raw stored form of `value`, e.g. for DDL defaults.
    fn representation(&self, value: bool) -> SqlValue {
        self.set_boolean(value)
    }

    /// Column type (and size) that holds this representation.
    fn storage_type(&self) -> (ColumnType, Option<u32>);
}

/// Booleans handed to the driver as booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBoolean;

impl BooleanRepresentation for NativeBoolean {
    fn set_boolean(&self, value: bool) -> SqlValue {
        SqlValue::Bool(value)
    }

    fn get_boolean(&self, stored: &SqlValue) -> Result<bool> {
        match stored {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Null => Ok(false),
            SqlValue::Int(n) => Ok(*n != 0),
            SqlValue::Text(s) => Ok(s.eq_ignore_ascii_case("true") || s == "1"),
            other => Err(cannot_decode(other)),
        }
    }

    fn storage_type(&self) -> (ColumnType, Option<u32>) {
        (ColumnType::Boolean, None)
    }
}

/// Booleans stored as two integers, `1`/`0` for the built-in variant.
#[derive(Debug, Clone, Copy)]
pub struct IntBoolean {
    true_value: i64,
    false_value: i64,
}

impl IntBoolean {
    #[must_use]
    pub const fn new(true_value: i64, false_value: i64) -> Self {
        Self {
            true_value,
            false_value,
        }
    }
}

impl BooleanRepresentation for IntBoolean {
    fn set_boolean(&self, value: bool) -> SqlValue {
        SqlValue::Int(if value {
            self.true_value
        } else {
            self.false_value
        })
    }

    fn get_boolean(&self, stored: &SqlValue) -> Result<bool> {
        match stored {
            SqlValue::Null => Ok(false),
            SqlValue::Bool(b) => Ok(*b),
            other => other
                .as_i64()
                .map(|n| n == self.true_value)
                .ok_or_else(|| cannot_decode(other)),
        }
    }

    fn storage_type(&self) -> (ColumnType, Option<u32>) {
        (ColumnType::SmallInt, None)
    }
}

/// Booleans stored as one of two tokens. Anything but the true token reads
/// as false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringBoolean {
    true_token: String,
    false_token: String,
}

impl StringBoolean {
    #[must_use]
    pub fn new(true_token: impl Into<String>, false_token: impl Into<String>) -> Self {
        Self {
            true_token: true_token.into(),
            false_token: false_token.into(),
        }
    }
}

impl BooleanRepresentation for StringBoolean {
    fn set_boolean(&self, value: bool) -> SqlValue {
        let token = if value {
            &self.true_token
        } else {
            &self.false_token
        };
        SqlValue::Text(token.clone())
    }

    fn get_boolean(&self, stored: &SqlValue) -> Result<bool> {
        match stored {
            SqlValue::Null => Ok(false),
            SqlValue::Text(s) => Ok(*s == self.true_token),
            SqlValue::Int(n) => Ok(n.to_string() == self.true_token),
            other => Err(cannot_decode(other)),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn storage_type(&self) -> (ColumnType, Option<u32>) {
        let width = self.true_token.len().max(self.false_token.len());
        (ColumnType::Char, Some(width as u32))
    }
}

fn cannot_decode(value: &SqlValue) -> Error {
    Error::InvalidValue(format!("cannot read {value:?} as a boolean"))
}

/// Keys of the built-in representations, in the order they are listed in
/// error messages.
pub const BUILTIN_KEYS: [&str; 7] = [
    "BOOLEAN",
    "INT_10",
    "STRING_10",
    "STRING_YN",
    "STRING_YN_LOWERCASE",
    "STRING_TF",
    "STRING_TF_LOWERCASE",
];

const PAIR_SEPARATOR: char = '/';

static BUILTINS: LazyLock<BTreeMap<&'static str, Arc<dyn BooleanRepresentation>>> =
    LazyLock::new(|| {
        let mut map: BTreeMap<&'static str, Arc<dyn BooleanRepresentation>> = BTreeMap::new();
        map.insert("BOOLEAN", Arc::new(NativeBoolean));
        map.insert("INT_10", Arc::new(IntBoolean::new(1, 0)));
        map.insert("STRING_10", Arc::new(StringBoolean::new("1", "0")));
        map.insert("STRING_YN", Arc::new(StringBoolean::new("Y", "N")));
        map.insert("STRING_YN_LOWERCASE", Arc::new(StringBoolean::new("y", "n")));
        map.insert("STRING_TF", Arc::new(StringBoolean::new("T", "F")));
        map.insert("STRING_TF_LOWERCASE", Arc::new(StringBoolean::new("t", "f")));
        map
    });

type PluginCtor = Arc<dyn Fn() -> Arc<dyn BooleanRepresentation> + Send + Sync>;

/// Resolves configuration keys to representations.
///
/// Besides the built-in keys and `"true/false"` token pairs, custom
/// representations can be registered under a name and selected by it.
#[derive(Clone, Default)]
pub struct BooleanRepresentationFactory {
    plugins: HashMap<String, PluginCtor>,
}

impl fmt::Debug for BooleanRepresentationFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.plugins.keys().collect();
        names.sort();
        f.debug_struct("BooleanRepresentationFactory")
            .field("plugins", &names)
            .finish()
    }
}

impl BooleanRepresentationFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom representation under `name`.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<String>, ctor: F) -> Self
    where
        F: Fn() -> Arc<dyn BooleanRepresentation> + Send + Sync + 'static,
    {
        self.plugins.insert(name.into(), Arc::new(ctor));
        self
    }

    /// Resolves `key`: built-in name, then `"true/false"` pair, then a
    /// registered plug-in.
    pub fn value_of(&self, key: &str) -> Result<Arc<dyn BooleanRepresentation>> {
        if let Some(builtin) = BUILTINS.get(key) {
            return Ok(Arc::clone(builtin));
        }

        if key.contains(PAIR_SEPARATOR) {
            let tokens: Vec<&str> = key
                .split(PAIR_SEPARATOR)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();
            return match tokens.as_slice() {
                [t, f] => Ok(Arc::new(StringBoolean::new(*t, *f))),
                _ => Err(Error::Configuration(format!(
                    "boolean representation \"{key}\" must name exactly two tokens \
                     separated by '{PAIR_SEPARATOR}'"
                ))),
            };
        }

        if let Some(ctor) = self.plugins.get(key) {
            return Ok(ctor());
        }

        Err(Error::Configuration(format!(
            "unrecognized boolean representation \"{key}\"; expected one of {} \
             or a \"true{PAIR_SEPARATOR}false\" pair",
            BUILTIN_KEYS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_yn_round_trip() {
        let repr = BooleanRepresentationFactory::new().value_of("STRING_YN").unwrap();
        assert_eq!(repr.set_boolean(true), SqlValue::Text(String::from("Y")));
        assert!(repr.get_boolean(&repr.set_boolean(true)).unwrap());
        assert!(!repr.get_boolean(&repr.set_boolean(false)).unwrap());
        assert_eq!(repr.storage_type(), (ColumnType::Char, Some(1)));
    }

    #[test]
    fn test_every_builtin_round_trips() {
        let factory = BooleanRepresentationFactory::new();
        for key in BUILTIN_KEYS {
            let repr = factory.value_of(key).unwrap();
            for value in [true, false] {
                assert_eq!(
                    repr.get_boolean(&repr.set_boolean(value)).unwrap(),
                    value,
                    "{key} failed for {value}"
                );
            }
        }
    }

    #[test]
    fn test_int_10_representation() {
        let repr = BooleanRepresentationFactory::new().value_of("INT_10").unwrap();
        assert_eq!(repr.representation(true), SqlValue::Int(1));
        assert_eq!(repr.representation(false), SqlValue::Int(0));
        assert!(repr.get_boolean(&SqlValue::decimal("1")).unwrap());
    }

    #[test]
    fn test_ad_hoc_pair() {
        let repr = BooleanRepresentationFactory::new().value_of("ja/nein").unwrap();
        assert_eq!(repr.set_boolean(false), SqlValue::Text(String::from("nein")));
        assert!(repr.get_boolean(&SqlValue::Text(String::from("ja"))).unwrap());
        assert!(!repr.get_boolean(&SqlValue::Text(String::from("vielleicht"))).unwrap());
        assert_eq!(repr.storage_type(), (ColumnType::Char, Some(4)));
    }

    #[test]
    fn test_malformed_pair_is_rejected() {
        let factory = BooleanRepresentationFactory::new();
        for key in ["Y/", "a/b/c", "/"] {
            let err = factory.value_of(key).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{key}");
        }
    }

    #[test]
    fn test_unknown_key_lists_builtins() {
        let err = BooleanRepresentationFactory::new()
            .value_of("unknown-key")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown-key"));
        for key in BUILTIN_KEYS {
            assert!(message.contains(key), "missing {key} in {message}");
        }
    }

    #[test]
    fn test_registered_plugin() {
        let factory = BooleanRepresentationFactory::new()
            .register("MINUS_ONE", || Arc::new(IntBoolean::new(-1, 0)));
        let repr = factory.value_of("MINUS_ONE").unwrap();
        assert_eq!(repr.set_boolean(true), SqlValue::Int(-1));
        assert!(repr.get_boolean(&SqlValue::Int(-1)).unwrap());
    }
}
