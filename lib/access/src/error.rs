//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ResolveError`: Errors from raw input classification and alias lookup
//! - `ValidationError`: Errors from token record validation
//! - `DirectoryError`: Transport errors from the alias directory
//! - `StoreError`: Errors from the token store
//! - `AuditError`: Errors from the audit sink
//!
//! `ValidationError` Display strings are stable and deliberately avoid
//! revealing whether a token ever existed versus was revoked. The distinct
//! variants are kept apart so callers can log and meter them separately.

use std::fmt;

/// Errors from resolving raw caller input into a token value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Input was empty after trimming.
    EmptyInput,
    /// Alias-like input had no directory entry.
    AliasNotFound { alias: String },
    /// Alias directory could not be reached.
    Network { reason: String },
    /// Alias directory returned a malformed response.
    UnexpectedResponse { reason: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "no access code was provided"),
            Self::AliasNotFound { alias } => {
                write!(f, "alias '{alias}' is not registered")
            }
            Self::Network { reason } => {
                write!(f, "alias directory unreachable: {reason}")
            }
            Self::UnexpectedResponse { reason } => {
                write!(f, "alias directory returned an unexpected response: {reason}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Transport errors from the alias directory collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory could not be reached.
    Network { reason: String },
    /// The directory answered with something unparseable.
    UnexpectedResponse { reason: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "directory network error: {reason}"),
            Self::UnexpectedResponse { reason } => {
                write!(f, "directory unexpected response: {reason}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<DirectoryError> for ResolveError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Network { reason } => Self::Network { reason },
            DirectoryError::UnexpectedResponse { reason } => Self::UnexpectedResponse { reason },
        }
    }
}

/// Errors from validating a token record.
///
/// Display strings are user-safe: they never distinguish a token that was
/// never minted from one that was revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No token record matches the presented value.
    InvalidToken,
    /// The token record exists but has been deactivated.
    InactiveToken,
    /// The token record has passed its expiry time.
    ExpiredToken,
    /// The token record has consumed all of its allowed views.
    ViewLimitExceeded,
    /// The share link requires a password that was missing or wrong.
    PasswordRequired,
    /// The token store failed to answer.
    Store { reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "this access code is not valid"),
            Self::InactiveToken => write!(f, "this access code is no longer active"),
            Self::ExpiredToken => write!(f, "this access code has expired"),
            Self::ViewLimitExceeded => {
                write!(f, "the view limit for this access code has been reached")
            }
            Self::PasswordRequired => write!(f, "this link requires a password"),
            Self::Store { reason } => write!(f, "token store error: {reason}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors from token store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A read query failed.
    QueryFailed { reason: String },
    /// A write failed.
    WriteFailed { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryFailed { reason } => write!(f, "store query failed: {reason}"),
            Self::WriteFailed { reason } => write!(f, "store write failed: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from the audit sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Entry could not be serialized.
    Serialize { reason: String },
    /// Entry could not be written.
    Io { reason: String },
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize { reason } => write!(f, "audit serialize failed: {reason}"),
            Self::Io { reason } => write!(f, "audit write failed: {reason}"),
        }
    }
}

impl std::error::Error for AuditError {}
