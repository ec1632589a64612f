//! Resolved access context and capability derivation.
//!
//! A [`ResolvedAccessContext`] is the single canonical shape every validated
//! credential collapses into. Legacy per-student tokens are translated here
//! into family-scope contexts, so downstream components never see the legacy
//! schema.

use serde::{Deserialize, Serialize};
use velvet_shutter_core::{AssetId, EventId, FolderId, SubjectId, TokenId};

use crate::token::{AccessToken, ShareSettings, TokenBinding, TokenScope};

/// Capability flags derived from scope and share configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// May view previews.
    pub can_view: bool,
    /// May fetch original files.
    pub can_download: bool,
    /// May purchase prints.
    pub can_purchase: bool,
    /// May leave comments.
    pub can_comment: bool,
}

impl Capabilities {
    /// Derives capabilities for a scope.
    ///
    /// Share-scope download/comment flags come from the share settings; all
    /// audiences that can view can also purchase prints.
    #[must_use]
    pub fn for_scope(scope: TokenScope, share: &ShareSettings) -> Self {
        match scope {
            TokenScope::Event => Self {
                can_view: true,
                can_download: true,
                can_purchase: true,
                can_comment: true,
            },
            TokenScope::Course => Self {
                can_view: true,
                can_download: false,
                can_purchase: true,
                can_comment: false,
            },
            TokenScope::Family | TokenScope::LegacySubject => Self {
                can_view: true,
                can_download: true,
                can_purchase: true,
                can_comment: true,
            },
            TokenScope::Share => Self {
                can_view: true,
                can_download: share.allow_download,
                can_purchase: true,
                can_comment: share.allow_comments,
            },
        }
    }
}

/// The media slice a context is allowed to query.
///
/// Derived exclusively from the validated token binding; caller-supplied
/// filters may narrow but never widen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GalleryScope {
    /// Every asset in an event.
    Event { event_id: EventId },
    /// Every asset in one folder.
    Folder {
        event_id: EventId,
        folder_id: FolderId,
    },
    /// Every asset assigned to one subject.
    Subject {
        event_id: EventId,
        subject_id: SubjectId,
    },
}

impl GalleryScope {
    /// Returns the event this scope belongs to.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::Event { event_id }
            | Self::Folder { event_id, .. }
            | Self::Subject { event_id, .. } => *event_id,
        }
    }
}

/// A validated credential, normalized to the canonical access model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAccessContext {
    /// The validated token.
    pub token_id: TokenId,
    /// Scope class after legacy translation.
    pub scope: TokenScope,
    /// The bound event.
    pub event_id: EventId,
    /// Bound folder, when the credential narrows to one.
    pub folder_id: Option<FolderId>,
    /// Bound subject, when the credential narrows to one.
    pub subject_id: Option<SubjectId>,
    /// Share configuration (defaults for non-share scopes).
    pub share: ShareSettings,
    /// Derived capability flags.
    pub capabilities: Capabilities,
    /// Label of the legacy system the credential was imported from.
    pub legacy_source: Option<String>,
}

impl ResolvedAccessContext {
    /// Builds the canonical context from a validated token record.
    ///
    /// Legacy per-student bindings become family-scope contexts bound to the
    /// implicit subject.
    #[must_use]
    pub fn from_token(token: &AccessToken) -> Self {
        let (scope, folder_id, subject_id, share, legacy_source) = match &token.binding {
            TokenBinding::Event { .. } => {
                (TokenScope::Event, None, None, ShareSettings::default(), None)
            }
            TokenBinding::Course { folder_id, .. } => (
                TokenScope::Course,
                Some(*folder_id),
                None,
                ShareSettings::default(),
                None,
            ),
            TokenBinding::Family { subject_id, .. } => (
                TokenScope::Family,
                None,
                Some(*subject_id),
                ShareSettings::default(),
                None,
            ),
            TokenBinding::Share {
                folder_id,
                settings,
                ..
            } => (
                TokenScope::Share,
                *folder_id,
                None,
                settings.clone(),
                None,
            ),
            TokenBinding::LegacySubject {
                subject_id, source, ..
            } => (
                // Translated transparently: downstream sees a family context.
                TokenScope::Family,
                None,
                Some(*subject_id),
                ShareSettings::default(),
                Some(source.clone()),
            ),
        };

        let capabilities = Capabilities::for_scope(token.binding.scope(), &share);

        Self {
            token_id: token.id,
            scope,
            event_id: token.binding.event_id(),
            folder_id,
            subject_id,
            share,
            capabilities,
            legacy_source,
        }
    }

    /// Returns the query scope this context is confined to.
    #[must_use]
    pub fn gallery_scope(&self) -> GalleryScope {
        let event_id = self.event_id;
        if let Some(subject_id) = self.subject_id {
            GalleryScope::Subject {
                event_id,
                subject_id,
            }
        } else if let Some(folder_id) = self.folder_id {
            GalleryScope::Folder {
                event_id,
                folder_id,
            }
        } else {
            GalleryScope::Event { event_id }
        }
    }

    /// Returns true if the context's allowlist (when present) permits a photo.
    #[must_use]
    pub fn allows_photo(&self, asset_id: AssetId) -> bool {
        match &self.share.photo_allowlist {
            Some(allowed) => allowed.contains(&asset_id),
            None => true,
        }
    }
}
