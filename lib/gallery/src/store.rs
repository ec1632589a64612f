//! Asset store trait and in-memory implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use velvet_shutter_access::{GalleryScope, StoreError};
use velvet_shutter_core::{AssetId, AssignmentId, EventId, FolderId, SubjectId};
use velvet_shutter_media::{Asset, AssetOrigin, AssetStatus};

/// One asset as returned by a scoped query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryRecord {
    /// The asset.
    pub asset: Asset,
    /// How the asset entered the library.
    pub origin: AssetOrigin,
    /// The assignment that put this asset in a subject-scoped result.
    pub assignment_id: Option<AssignmentId>,
}

/// A scoped, filtered asset query.
///
/// `scope` always comes from a validated access context; the remaining
/// fields only ever narrow the result.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetQuery {
    /// The credential's slice of the library.
    pub scope: GalleryScope,
    /// Narrow to one folder inside the slice.
    pub folder_id: Option<FolderId>,
    /// Narrow to a single photo.
    pub photo_id: Option<AssetId>,
    /// Substring filename search.
    pub search_term: Option<String>,
    /// Share allowlist restriction.
    pub allowlist: Option<Vec<AssetId>>,
}

impl AssetQuery {
    /// A bare query over a scope.
    #[must_use]
    pub fn scoped(scope: GalleryScope) -> Self {
        Self {
            scope,
            folder_id: None,
            photo_id: None,
            search_term: None,
            allowlist: None,
        }
    }
}

/// One page of query results.
///
/// `items` and `total` come from the same snapshot, so `has_more` derived
/// from them is always consistent for that call.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPage {
    /// The page slice.
    pub items: Vec<GalleryRecord>,
    /// Total matches in the snapshot.
    pub total: u64,
}

/// Trait for paginated, scoped asset queries.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Fetches one page and the total for the same snapshot.
    ///
    /// Only `Ready` assets are returned.
    async fn query_page(
        &self,
        query: &AssetQuery,
        page: u32,
        limit: u32,
    ) -> Result<AssetPage, StoreError>;
}

/// A stored asset with its event linkage and subject assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    /// The asset and its delivery metadata.
    pub record: GalleryRecord,
    /// The event the asset's folder belongs to.
    pub event_id: EventId,
    /// Subjects the asset is assigned to.
    pub subject_ids: Vec<SubjectId>,
}

impl StoredAsset {
    /// Creates a staff-origin stored asset with no assignments.
    #[must_use]
    pub fn new(asset: Asset, event_id: EventId) -> Self {
        Self {
            record: GalleryRecord {
                asset,
                origin: AssetOrigin::Staff,
                assignment_id: None,
            },
            event_id,
            subject_ids: Vec::new(),
        }
    }

    /// Assigns the asset to a subject.
    #[must_use]
    pub fn assigned_to(mut self, subject_id: SubjectId) -> Self {
        self.subject_ids.push(subject_id);
        self.record.assignment_id.get_or_insert_with(AssignmentId::new);
        self
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: AssetOrigin) -> Self {
        self.record.origin = origin;
        self
    }
}

/// In-memory asset store.
///
/// Backs tests and single-process deployments. Queries filter under one
/// read lock, so the page slice and total always come from one snapshot.
#[derive(Default)]
pub struct InMemoryAssetStore {
    assets: RwLock<Vec<StoredAsset>>,
}

impl InMemoryAssetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a stored asset.
    pub fn insert(&self, asset: StoredAsset) {
        self.assets.write().unwrap().push(asset);
    }
}

fn matches_scope(stored: &StoredAsset, scope: &GalleryScope) -> bool {
    match scope {
        GalleryScope::Event { event_id } => stored.event_id == *event_id,
        GalleryScope::Folder {
            event_id,
            folder_id,
        } => stored.event_id == *event_id && stored.record.asset.folder_id == *folder_id,
        GalleryScope::Subject {
            event_id,
            subject_id,
        } => stored.event_id == *event_id && stored.subject_ids.contains(subject_id),
    }
}

fn matches_filters(stored: &StoredAsset, query: &AssetQuery) -> bool {
    let asset = &stored.record.asset;
    if let Some(folder_id) = query.folder_id {
        if asset.folder_id != folder_id {
            return false;
        }
    }
    if let Some(photo_id) = query.photo_id {
        if asset.id != photo_id {
            return false;
        }
    }
    if let Some(allowlist) = &query.allowlist {
        if !allowlist.contains(&asset.id) {
            return false;
        }
    }
    if let Some(term) = &query.search_term {
        if !asset
            .filename
            .to_lowercase()
            .contains(&term.to_lowercase())
        {
            return false;
        }
    }
    true
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn query_page(
        &self,
        query: &AssetQuery,
        page: u32,
        limit: u32,
    ) -> Result<AssetPage, StoreError> {
        let assets = self.assets.read().unwrap();

        let mut matched: Vec<&StoredAsset> = assets
            .iter()
            .filter(|a| a.record.asset.status == AssetStatus::Ready)
            .filter(|a| matches_scope(a, &query.scope))
            .filter(|a| matches_filters(a, query))
            .collect();
        // ULIDs are time-ordered, so ID order is stable capture order.
        matched.sort_by_key(|a| a.record.asset.id.as_ulid());

        let total = matched.len() as u64;
        let offset = (page.max(1) as usize - 1) * limit as usize;
        let items = matched
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(|a| a.record.clone())
            .collect();

        Ok(AssetPage { items, total })
    }
}
