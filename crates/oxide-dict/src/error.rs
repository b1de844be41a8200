//! Error types for dictionary operations.

use thiserror::Error;

use crate::exceptions::StoreError;

/// Errors raised by the dictionary layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid setup, detected before any statement runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The dialect has no way to express the requested fragment.
    #[error("{operation} is not supported by the {platform} dictionary")]
    Unsupported {
        /// Platform name of the dictionary.
        platform: String,
        /// The fragment or feature that was requested.
        operation: &'static str,
    },

    /// A statement failed in the database.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A value cannot be converted for binding.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A caller broke a contract of this crate.
    #[error("internal consistency error: {0}")]
    Internal(String),

    /// Configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn unsupported(platform: &str, operation: &'static str) -> Self {
        Self::Unsupported {
            platform: String::from(platform),
            operation,
        }
    }
}

/// Result type alias for dictionary operations.
pub type Result<T> = std::result::Result<T, Error>;
