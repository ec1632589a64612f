//! Token resolution and access validation for velvet-shutter.
//!
//! This crate normalizes the heterogeneous credential formats the platform
//! accepts (aliases, short share codes, opaque tokens, legacy per-student
//! tokens) into one canonical access model:
//!
//! - [`TokenResolver`] classifies raw caller input and resolves aliases
//!   through an [`AliasDirectory`]
//! - [`AccessValidator`] looks up the token record by digest, enforces
//!   activity/expiry/view-limit policy, and produces a
//!   [`ResolvedAccessContext`] with derived capability flags
//! - [`AuditSink`] receives an append-only access log entry per successful
//!   validation
//!
//! Token values are stored and compared as SHA-256 digests; plaintext values
//! never reach a log field.
//!
//! # Access Control Model
//!
//! Every credential binds to exactly one slice of one event: the whole event,
//! a folder (course), or a subject (family/student). Downstream components
//! derive their query scope exclusively from the resolved context, so a
//! caller can narrow but never escape the slice its credential grants.

pub mod audit;
pub mod context;
pub mod error;
pub mod resolver;
pub mod store;
pub mod token;
pub mod validator;

pub use audit::{AccessLogEntry, AuditSink, JsonlAuditSink};
pub use context::{Capabilities, GalleryScope, ResolvedAccessContext};
pub use error::{AuditError, DirectoryError, ResolveError, StoreError, ValidationError};
pub use resolver::{
    AliasDirectory, AliasRecord, CredentialSource, RequestContext, ResolvedInput, TokenResolver,
};
pub use store::{InMemoryTokenStore, TokenStore};
pub use token::{AccessToken, ShareSettings, TokenBinding, TokenHash, TokenScope};
pub use validator::AccessValidator;
