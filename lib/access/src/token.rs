//! Access token records and credential digests.
//!
//! Token values are opaque strings minted by an external issuance workflow.
//! This engine only ever sees the presented value long enough to digest it;
//! records are stored and compared by SHA-256 digest, and plaintext values
//! never reach a log field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use velvet_shutter_core::{AssetId, EventId, FolderId, SubjectId, TokenId};

/// SHA-256 digest of an opaque credential value.
///
/// Equality is constant-time. The digest is re-checked after every map
/// lookup as defense in depth against timing leakage.
#[derive(Clone, Copy)]
pub struct TokenHash([u8; 32]);

impl TokenHash {
    /// Digests a presented credential value.
    #[must_use]
    pub fn digest(value: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the digest as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a digest from lowercase hex.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl PartialEq for TokenHash {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for TokenHash {}

impl std::hash::Hash for TokenHash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Truncated form only; enough to correlate, not to look up.
        write!(f, "TokenHash({}…)", &self.to_hex()[..8])
    }
}

impl Serialize for TokenHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TokenHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The audience class a token grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// Event staff: the whole event.
    Event,
    /// A single course/folder within an event.
    Course,
    /// A single family's subject.
    Family,
    /// Anonymous public share of an event or folder.
    Share,
    /// Legacy per-student token from the previous schema.
    LegacySubject,
}

impl TokenScope {
    /// Returns the scope name as used in logs and config keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Course => "course",
            Self::Family => "family",
            Self::Share => "share",
            Self::LegacySubject => "legacy_subject",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Share link configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShareSettings {
    /// Whether the audience may fetch original files.
    #[serde(default)]
    pub allow_download: bool,
    /// Whether the audience may leave comments.
    #[serde(default)]
    pub allow_comments: bool,
    /// Restricts the share to an explicit set of photos.
    #[serde(default)]
    pub photo_allowlist: Option<Vec<AssetId>>,
    /// Digest of an optional link password.
    #[serde(default)]
    pub password_hash: Option<TokenHash>,
}

impl ShareSettings {
    /// Settings for an open share: no download, no comments, no allowlist.
    #[must_use]
    pub fn view_only() -> Self {
        Self::default()
    }

    /// Enables downloads.
    #[must_use]
    pub fn with_download(mut self) -> Self {
        self.allow_download = true;
        self
    }

    /// Enables comments.
    #[must_use]
    pub fn with_comments(mut self) -> Self {
        self.allow_comments = true;
        self
    }

    /// Restricts the share to the given photos.
    #[must_use]
    pub fn with_allowlist(mut self, photos: Vec<AssetId>) -> Self {
        self.photo_allowlist = Some(photos);
        self
    }

    /// Protects the link with a password.
    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        self.password_hash = Some(TokenHash::digest(password));
        self
    }
}

/// What a token is bound to.
///
/// Heterogeneous credential shapes (canonical and legacy) are represented as
/// one tagged union; the legacy shape is translated away during validation
/// and no later component branches on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum TokenBinding {
    /// Staff access to a whole event.
    Event { event_id: EventId },
    /// Access to one course folder.
    Course {
        event_id: EventId,
        folder_id: FolderId,
    },
    /// Access to one family's subject.
    Family {
        event_id: EventId,
        subject_id: SubjectId,
    },
    /// Anonymous share of an event, optionally narrowed to a folder.
    Share {
        event_id: EventId,
        folder_id: Option<FolderId>,
        #[serde(default)]
        settings: ShareSettings,
    },
    /// Per-student token imported from the previous schema.
    LegacySubject {
        event_id: EventId,
        subject_id: SubjectId,
        /// Label of the system the token was imported from.
        source: String,
    },
}

impl TokenBinding {
    /// Returns the scope class of this binding.
    #[must_use]
    pub fn scope(&self) -> TokenScope {
        match self {
            Self::Event { .. } => TokenScope::Event,
            Self::Course { .. } => TokenScope::Course,
            Self::Family { .. } => TokenScope::Family,
            Self::Share { .. } => TokenScope::Share,
            Self::LegacySubject { .. } => TokenScope::LegacySubject,
        }
    }

    /// Returns the event the binding belongs to.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::Event { event_id }
            | Self::Course { event_id, .. }
            | Self::Family { event_id, .. }
            | Self::Share { event_id, .. }
            | Self::LegacySubject { event_id, .. } => *event_id,
        }
    }
}

/// A stored access token record.
///
/// Mutated only by the validator's best-effort `view_count` increment;
/// created and revoked by external admin workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Unique identifier.
    pub id: TokenId,
    /// Digest of the opaque token value.
    pub hash: TokenHash,
    /// What the token grants access to.
    pub binding: TokenBinding,
    /// Whether the token is currently active.
    pub is_active: bool,
    /// Optional expiry time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Optional cap on total views.
    pub max_views: Option<u32>,
    /// Number of successful validations so far.
    pub view_count: u32,
    /// When the token was minted.
    pub created_at: DateTime<Utc>,
    /// Issuer-defined metadata.
    pub metadata: JsonValue,
}

impl AccessToken {
    /// Creates an active, unlimited token record for the given value.
    #[must_use]
    pub fn new(value: &str, binding: TokenBinding) -> Self {
        Self {
            id: TokenId::new(),
            hash: TokenHash::digest(value),
            binding,
            is_active: true,
            expires_at: None,
            max_views: None,
            view_count: 0,
            created_at: Utc::now(),
            metadata: JsonValue::Null,
        }
    }

    /// Sets an expiry time.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Caps the number of views.
    #[must_use]
    pub fn with_max_views(mut self, max_views: u32) -> Self {
        self.max_views = Some(max_views);
        self
    }

    /// Deactivates the token.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns the scope class.
    #[must_use]
    pub fn scope(&self) -> TokenScope {
        self.binding.scope()
    }

    /// Returns true if the token has passed its expiry time.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }

    /// Returns true if the view cap has been consumed.
    #[must_use]
    pub fn views_exhausted(&self) -> bool {
        matches!(self.max_views, Some(max) if self.view_count >= max)
    }
}
