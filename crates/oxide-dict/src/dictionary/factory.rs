//! Looks up dictionaries by platform name, connection URL or reported
//! product name.

use std::sync::Arc;

use tracing::debug;

use super::{access, derby, firebird, h2, herddb, hsql, informix, mysql, soliddb, sqlserver};
use super::DBDictionary;
use crate::boolean::{BooleanRepresentation, BooleanRepresentationFactory};
use crate::driver::DriverMetadata;
use crate::error::{Error, Result};

type Constructor = fn() -> DBDictionary;

/// `(canonical name, aliases, constructor)`.
const PLATFORMS: &[(&str, &[&str], Constructor)] = &[
    ("access", &["msaccess", "jet"], access::dictionary),
    ("derby", &["apache derby", "javadb"], derby::dictionary),
    ("firebird", &["interbase", "firebirdsql"], firebird::dictionary),
    ("generic", &["ansi", "sql92"], DBDictionary::base),
    ("h2", &["h2database"], h2::dictionary),
    ("herddb", &["herd"], herddb::dictionary),
    ("hsql", &["hsqldb", "hypersonic"], hsql::dictionary),
    ("informix", &["ids", "informix-sqli"], informix::dictionary),
    ("mysql", &["mariadb"], mysql::dictionary),
    ("soliddb", &["solid"], soliddb::dictionary),
    ("sqlserver", &["mssql", "microsoft sql server", "jtds"], sqlserver::dictionary),
];

/// `(URL prefix, canonical name)`, checked in order.
const URL_PREFIXES: &[(&str, &str)] = &[
    ("jdbc:mysql:", "mysql"),
    ("jdbc:mariadb:", "mysql"),
    ("jdbc:derby:", "derby"),
    ("jdbc:h2:", "h2"),
    ("jdbc:hsqldb:", "hsql"),
    ("jdbc:informix-sqli:", "informix"),
    ("jdbc:sqlserver:", "sqlserver"),
    ("jdbc:jtds:", "sqlserver"),
    ("jdbc:firebirdsql:", "firebird"),
    ("jdbc:solid:", "soliddb"),
    ("jdbc:herddb:", "herddb"),
    ("jdbc:odbc:", "access"),
    ("jdbc:ucanaccess:", "access"),
];

/// `(product name fragment, canonical name)`, matched case-insensitively.
const PRODUCT_NAMES: &[(&str, &str)] = &[
    ("mysql", "mysql"),
    ("mariadb", "mysql"),
    ("derby", "derby"),
    ("h2", "h2"),
    ("hsql", "hsql"),
    ("informix", "informix"),
    ("sql server", "sqlserver"),
    ("firebird", "firebird"),
    ("solid", "soliddb"),
    ("herddb", "herddb"),
    ("access", "access"),
];

/// Builds dictionaries. Custom boolean representations registered here
/// become available to [`DictionaryConfig`](super::DictionaryConfig).
#[derive(Debug, Clone, Default)]
pub struct DictionaryFactory {
    booleans: BooleanRepresentationFactory,
}

impl DictionaryFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `booleans` to resolve boolean representation keys.
    #[must_use]
    pub fn with_booleans(mut self, booleans: BooleanRepresentationFactory) -> Self {
        self.booleans = booleans;
        self
    }

    /// Canonical platform names, sorted.
    #[must_use]
    pub fn list() -> Vec<&'static str> {
        PLATFORMS.iter().map(|(name, _, _)| *name).collect()
    }

    /// Dictionary for a platform name or alias (case-insensitive).
    pub fn for_name(&self, name: &str) -> Result<DBDictionary> {
        let wanted = name.trim().to_ascii_lowercase();
        PLATFORMS
            .iter()
            .find(|(canonical, aliases, _)| *canonical == wanted || aliases.contains(&wanted.as_str()))
            .map(|(_, _, ctor)| ctor())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "unknown database platform \"{name}\"; expected one of {}",
                    Self::list().join(", ")
                ))
            })
    }

    /// Dictionary for a jdbc-style connection URL.
    pub fn for_url(&self, url: &str) -> Result<DBDictionary> {
        let lower = url.to_ascii_lowercase();
        let (_, name) = URL_PREFIXES
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .ok_or_else(|| {
                Error::Configuration(format!("cannot tell the database platform of \"{url}\""))
            })?;
        debug!(url, platform = name, "platform selected from url");
        self.for_name(name)
    }

    /// Dictionary for the product a driver reports.
    pub fn for_metadata(&self, meta: &DriverMetadata) -> Result<DBDictionary> {
        let product = meta.database_product_name.to_ascii_lowercase();
        let (_, name) = PRODUCT_NAMES
            .iter()
            .find(|(fragment, _)| product.contains(fragment))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no dictionary for database product \"{}\"",
                    meta.database_product_name
                ))
            })?;
        self.for_name(name)
    }

    /// Resolves a boolean representation key.
    pub fn boolean_representation(&self, key: &str) -> Result<Arc<dyn BooleanRepresentation>> {
        self.booleans.value_of(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_aliases() {
        let factory = DictionaryFactory::new();
        assert_eq!(factory.for_name("MySQL").unwrap().platform, "MySQL");
        assert_eq!(factory.for_name("mariadb").unwrap().platform, "MySQL");
        assert_eq!(factory.for_name(" HSQLDB ").unwrap().platform, "HSQL");
        let err = factory.for_name("oracle").unwrap_err();
        assert!(err.to_string().contains("sqlserver"));
    }

    #[test]
    fn test_list_is_sorted_and_complete() {
        let names = DictionaryFactory::list();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 11);
        let factory = DictionaryFactory::new();
        for name in names {
            assert!(factory.for_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_for_url() {
        let factory = DictionaryFactory::new();
        assert_eq!(
            factory.for_url("jdbc:derby:memory:test;create=true").unwrap().platform,
            "Apache Derby"
        );
        assert_eq!(
            factory.for_url("jdbc:jtds:sqlserver://host/db").unwrap().platform,
            "Microsoft SQL Server"
        );
        assert_eq!(
            factory.for_url("jdbc:odbc:northwind").unwrap().platform,
            "Microsoft Access"
        );
        assert!(factory.for_url("postgres://localhost").is_err());
    }

    #[test]
    fn test_for_metadata() {
        let factory = DictionaryFactory::new();
        let meta = DriverMetadata {
            database_product_name: String::from("HSQL Database Engine"),
            ..DriverMetadata::default()
        };
        assert_eq!(factory.for_metadata(&meta).unwrap().platform, "HSQL");
    }
}
