//! Raw input classification and alias resolution.
//!
//! Callers present credentials in several formats: short memorable aliases
//! ("luna1234"), share short codes, and canonical opaque tokens. The
//! resolver normalizes all of them to a single token value before lookup.
//!
//! Classification, after trimming:
//! - any non-alphanumeric character, or length >= 20: canonical opaque
//!   token, used verbatim
//! - alphanumeric and <= 16 chars: alias-like, lowercased and resolved via
//!   the alias directory; on a directory miss, 4-12 char inputs fall
//!   through and are treated as short-code token values

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{DirectoryError, ResolveError};

/// Minimum length of a canonical opaque token.
const OPAQUE_TOKEN_MIN_LEN: usize = 20;

/// Maximum length of an alias.
const ALIAS_MAX_LEN: usize = 16;

/// Length range of a share short code.
const SHORT_CODE_LEN: std::ops::RangeInclusive<usize> = 4..=12;

/// Per-request caller context, attached to audit entries and rate keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller IP, when known.
    pub ip: Option<IpAddr>,
    /// Caller user agent, when known.
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Creates an empty request context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caller IP.
    #[must_use]
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Sets the caller user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// A directory entry mapping an alias to its underlying token value.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRecord {
    /// The token value the alias stands for.
    pub token_value: String,
    /// Issuer-defined metadata attached to the alias.
    pub metadata: JsonValue,
}

/// Trait for alias lookup.
///
/// Implementations typically front a directory service; the in-process fake
/// used in tests is a map.
#[async_trait]
pub trait AliasDirectory: Send + Sync {
    /// Looks up an alias.
    ///
    /// Returns `Ok(None)` for a well-formed "no such alias" answer;
    /// transport and protocol failures are errors.
    async fn lookup(&self, alias: &str) -> Result<Option<AliasRecord>, DirectoryError>;
}

/// How the presented credential was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Resolved through the alias directory.
    Alias,
    /// Used directly as a token value.
    Token,
}

/// The outcome of input normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    /// The canonical token value to validate.
    pub token_value: String,
    /// How the input was classified.
    pub source: CredentialSource,
    /// Directory metadata, when the input was an alias.
    pub alias_metadata: Option<JsonValue>,
}

/// Normalizes raw caller input into a canonical token value.
pub struct TokenResolver {
    directory: Arc<dyn AliasDirectory>,
}

impl TokenResolver {
    /// Creates a resolver backed by the given alias directory.
    #[must_use]
    pub fn new(directory: Arc<dyn AliasDirectory>) -> Self {
        Self { directory }
    }

    /// Resolves raw input to a token value.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` for blank input, `AliasNotFound` for an
    /// alias-only-shaped input with no directory entry, and
    /// `Network`/`UnexpectedResponse` for directory transport failures.
    #[instrument(skip_all, fields(input_len = raw_input.len()))]
    pub async fn resolve(
        &self,
        raw_input: &str,
        _ctx: &RequestContext,
    ) -> Result<ResolvedInput, ResolveError> {
        let trimmed = raw_input.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::EmptyInput);
        }

        let alias_like = trimmed.len() <= ALIAS_MAX_LEN
            && trimmed.chars().all(|c| c.is_ascii_alphanumeric());

        if !alias_like || trimmed.len() >= OPAQUE_TOKEN_MIN_LEN {
            debug!(source = "token", "input classified as opaque token");
            return Ok(ResolvedInput {
                token_value: trimmed.to_string(),
                source: CredentialSource::Token,
                alias_metadata: None,
            });
        }

        let alias = trimmed.to_ascii_lowercase();
        match self.directory.lookup(&alias).await? {
            Some(record) => {
                debug!(source = "alias", "alias resolved");
                Ok(ResolvedInput {
                    token_value: record.token_value,
                    source: CredentialSource::Alias,
                    alias_metadata: Some(record.metadata),
                })
            }
            None if SHORT_CODE_LEN.contains(&trimmed.len()) => {
                // Short codes are stored token values themselves; a directory
                // miss in this range falls through to direct validation.
                debug!(source = "token", "directory miss, treating as short code");
                Ok(ResolvedInput {
                    token_value: trimmed.to_string(),
                    source: CredentialSource::Token,
                    alias_metadata: None,
                })
            }
            None => Err(ResolveError::AliasNotFound { alias }),
        }
    }
}
