//! Error types for the media crate.

use std::fmt;

/// Errors from blob storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    /// The object does not exist in the bucket.
    NotFound,
    /// The storage backend failed to answer.
    Unavailable { reason: String },
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "object not found"),
            Self::Unavailable { reason } => write!(f, "blob storage unavailable: {reason}"),
        }
    }
}

impl std::error::Error for BlobError {}

/// Errors from secure URL issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// No processed rendition exists for a preview-class request.
    NoSafePath,
    /// The selected object is missing from storage.
    ObjectMissing,
    /// The storage backend failed.
    Storage { reason: String },
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSafePath => write!(f, "no safe rendition is available for this photo"),
            Self::ObjectMissing => write!(f, "the requested rendition is missing from storage"),
            Self::Storage { reason } => write!(f, "storage error: {reason}"),
        }
    }
}

impl std::error::Error for UrlError {}
