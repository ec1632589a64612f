//! Asset model and secure URL issuance for velvet-shutter.
//!
//! The one hard rule of media delivery: full-resolution source files are
//! never served to untrusted callers. [`SecureUrlIssuer`] enforces a
//! watermark-first fallback order for preview-class requests and refuses to
//! build a URL from a `storage_path` in any preview context, regardless of
//! caller flags.
//!
//! Path classification is explicit: the watermark/preview/storage fields on
//! [`Asset`] are the primary control, and the naming heuristic
//! ([`asset::looks_processed`]) is defense in depth only.

pub mod asset;
pub mod error;
pub mod signer;

pub use asset::{Asset, AssetOrigin, AssetStatus, looks_processed, masked};
pub use error::{BlobError, UrlError};
pub use signer::{BlobStorage, BucketConfig, SecureUrlIssuer, SignedUrl, UrlSource};
