//! Translation of native driver failures into typed store errors.
//!
//! Drivers report failures as [`SqlError`]s linked through a "next
//! exception" pointer. The pointer is set after construction, so a chain can
//! revisit an error it already passed; [`chain`] walks it by identity and
//! stops at the first repeat.

use std::fmt;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::dictionary::DBDictionary;

/// A native error as reported by the driver.
pub struct SqlError {
    message: String,
    sql_state: Option<String>,
    vendor_code: i32,
    next: OnceLock<Arc<SqlError>>,
}

impl SqlError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            vendor_code: 0,
            next: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_sql_state(mut self, state: impl Into<String>) -> Self {
        self.sql_state = Some(state.into());
        self
    }

    #[must_use]
    pub const fn with_vendor_code(mut self, code: i32) -> Self {
        self.vendor_code = code;
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    #[must_use]
    pub const fn vendor_code(&self) -> i32 {
        self.vendor_code
    }

    /// Links the next error of the chain. Returns false if one was already
    /// linked; the first link wins.
    pub fn set_next(&self, next: Arc<Self>) -> bool {
        self.next.set(next).is_ok()
    }

    #[must_use]
    pub fn next(&self) -> Option<&Arc<Self>> {
        self.next.get()
    }

    /// Whether `code` names this error, either as SQLSTATE or vendor code.
    #[must_use]
    pub fn matches_code(&self, code: &str) -> bool {
        self.sql_state.as_deref() == Some(code) || self.vendor_code.to_string() == code
    }
}

// The next link may point back into the chain; only its message is shown.
impl fmt::Debug for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlError")
            .field("message", &self.message)
            .field("sql_state", &self.sql_state)
            .field("vendor_code", &self.vendor_code)
            .field("next", &self.next().map(|n| n.message()))
            .finish()
    }
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(state) = &self.sql_state {
            write!(f, " {{SQLState: {state}, code: {}}}", self.vendor_code)?;
        }
        Ok(())
    }
}

impl std::error::Error for SqlError {}

/// Flattens the next-exception chain starting at `head`, each error
/// appearing once, in order. Cycles terminate.
#[must_use]
pub fn chain(head: &Arc<SqlError>) -> Vec<Arc<SqlError>> {
    let mut seen: Vec<Arc<SqlError>> = vec![];
    let mut current = Some(head);
    while let Some(err) = current {
        if seen.iter().any(|s| Arc::ptr_eq(s, err)) {
            break;
        }
        seen.push(Arc::clone(err));
        current = err.next();
    }
    seen
}

/// What kind of integrity rule a statement broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityViolation {
    UniqueConstraint,
    ForeignKey,
    NotNull,
    Unknown,
}

/// Semantic classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    General,
    Lock,
    OptimisticLock,
    QueryTimeout,
    ReferentialIntegrity(IntegrityViolation),
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "store error"),
            Self::Lock => write!(f, "lock error"),
            Self::OptimisticLock => write!(f, "optimistic lock error"),
            Self::QueryTimeout => write!(f, "query timeout"),
            Self::ReferentialIntegrity(cause) => {
                write!(f, "referential integrity violation ({cause:?})")
            }
        }
    }
}

/// A typed failure carrying the full native chain.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
    /// Native errors, deduplicated, head first.
    pub chain: Vec<Arc<SqlError>>,
    /// Description of the object whose statement failed, if known.
    pub failed: Option<String>,
}

impl StoreError {
    #[must_use]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            chain: vec![],
            failed: None,
        }
    }

    /// Whether any native error of the chain carries `code`.
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.chain.iter().any(|e| e.matches_code(code))
    }

    /// Whether any native error of the chain has this vendor code.
    #[must_use]
    pub fn has_vendor_code(&self, code: i32) -> bool {
        self.chain.iter().any(|e| e.vendor_code() == code)
    }
}

/// Vendor error codes (SQLSTATEs or vendor numbers) per failure kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCodes {
    pub lock: Vec<String>,
    pub query_timeout: Vec<String>,
    pub referential_integrity: Vec<String>,
}

impl ErrorCodes {
    /// Codes every dictionary recognises: the standard SQLSTATE integrity
    /// class.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            lock: vec![],
            query_timeout: vec![],
            referential_integrity: codes(&["23000", "23502", "23503", "23505", "23513"]),
        }
    }

    /// Adds codes on top of the current ones.
    #[must_use]
    pub fn extend(mut self, lock: &[&str], timeout: &[&str], integrity: &[&str]) -> Self {
        self.lock.extend(codes(lock));
        self.query_timeout.extend(codes(timeout));
        self.referential_integrity.extend(codes(integrity));
        self
    }

    /// Classifies the first native error that matches a known code.
    #[must_use]
    pub fn classify(&self, chain: &[Arc<SqlError>]) -> StoreErrorKind {
        for err in chain {
            if self.lock.iter().any(|c| err.matches_code(c)) {
                return StoreErrorKind::Lock;
            }
            if self.query_timeout.iter().any(|c| err.matches_code(c)) {
                return StoreErrorKind::QueryTimeout;
            }
            if self.referential_integrity.iter().any(|c| err.matches_code(c)) {
                return StoreErrorKind::ReferentialIntegrity(IntegrityViolation::Unknown);
            }
        }
        StoreErrorKind::General
    }
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| String::from(*c)).collect()
}

/// Wraps a native failure into a [`StoreError`], letting the dictionary
/// classify it.
#[must_use]
pub fn store_error(
    message: impl Into<String>,
    err: &Arc<SqlError>,
    dict: &DBDictionary,
    failed: Option<String>,
) -> StoreError {
    dict.new_store_exception(message.into(), chain(err), failed)
}
