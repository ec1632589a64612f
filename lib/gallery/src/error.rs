//! Error types for the gallery crate.
//!
//! `GalleryError` is the terminal error of one resolution call. Component
//! errors convert into it via `From`; catalog and per-asset URL failures
//! degrade locally instead and never surface here, except in explicit
//! single-download mode where a signer failure is terminal.

use chrono::Duration;
use std::fmt;
use velvet_shutter_access::{ResolveError, StoreError, ValidationError};
use velvet_shutter_media::UrlError;
use velvet_shutter_throttle::CounterError;

/// Terminal errors for one resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    /// Raw input could not be resolved to a token value.
    Resolve(ResolveError),
    /// The token failed validation.
    Validation(ValidationError),
    /// The caller exceeded the scope's request limit.
    RateLimited { retry_after: Duration },
    /// The rate-limit counter store failed.
    Throttle(CounterError),
    /// The asset store failed.
    Store(StoreError),
    /// Signed URL issuance failed in single-download mode.
    Url(UrlError),
    /// The request asked for media outside the credential's slice.
    ScopeViolation,
}

impl fmt::Display for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "{e}"),
            Self::Validation(e) => write!(f, "{e}"),
            Self::RateLimited { retry_after } => {
                write!(
                    f,
                    "too many requests, retry in {}s",
                    retry_after.num_seconds().max(1)
                )
            }
            Self::Throttle(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
            Self::Url(e) => write!(f, "{e}"),
            Self::ScopeViolation => {
                write!(f, "the requested photo is not available to this access code")
            }
        }
    }
}

impl std::error::Error for GalleryError {}

impl From<ResolveError> for GalleryError {
    fn from(err: ResolveError) -> Self {
        Self::Resolve(err)
    }
}

impl From<ValidationError> for GalleryError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<CounterError> for GalleryError {
    fn from(err: CounterError) -> Self {
        Self::Throttle(err)
    }
}

impl From<StoreError> for GalleryError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<UrlError> for GalleryError {
    fn from(err: UrlError) -> Self {
        Self::Url(err)
    }
}
