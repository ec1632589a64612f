//! Response shapes for gallery resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use velvet_shutter_access::{Capabilities, TokenScope};
use velvet_shutter_core::{AssetId, AssignmentId, EventId, FolderId};
use velvet_shutter_media::AssetOrigin;

use crate::catalog::CatalogEntry;

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number, starting at 1.
    pub page: u32,
    /// Items per page.
    pub limit: u32,
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Clamps the request to sane bounds: page >= 1, 1 <= limit <= max.
    #[must_use]
    pub fn clamped(self, max_limit: u32) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, max_limit),
        }
    }

    /// Returns the zero-based item offset of this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit)
    }
}

/// Caller-supplied narrowing filters.
///
/// These narrow the query inside the credential's slice; they can never
/// widen it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryFilters {
    /// Narrow to one folder.
    pub folder_id: Option<FolderId>,
    /// Narrow to a single photo (favorites, deep links).
    pub photo_id: Option<AssetId>,
    /// Substring filename search.
    pub search_term: Option<String>,
}

/// One photo as delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoView {
    /// Asset identifier.
    pub id: AssetId,
    /// Original filename.
    pub filename: String,
    /// Watermarked grid rendition URL; `None` when issuance was refused.
    pub preview_url: Option<String>,
    /// Lightbox rendition URL (watermark first, preview fallback).
    pub signed_url: Option<String>,
    /// Source download URL; populated only for download-capable audiences.
    pub download_url: Option<String>,
    /// When the asset was created.
    pub created_at: DateTime<Utc>,
    /// Source size in bytes.
    pub size: u64,
    /// Source MIME type.
    pub mime_type: String,
    /// Folder the asset belongs to.
    pub folder_id: FolderId,
    /// How the asset entered the library.
    pub origin: AssetOrigin,
    /// Assignment record linking the asset to the viewed subject.
    pub assignment_id: Option<AssignmentId>,
}

/// One page of a gallery, with totals from the same query snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPage {
    /// Photos on this page.
    pub items: Vec<PhotoView>,
    /// Total photos in the queried slice.
    pub total: u64,
    /// Page number served.
    pub page: u32,
    /// Page size served.
    pub limit: u32,
    /// Whether later pages exist.
    pub has_more: bool,
}

impl GalleryPage {
    /// An empty page for a request that matched nothing.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: request.page,
            limit: request.limit,
            has_more: false,
        }
    }
}

/// The full response of one resolution call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryResponse {
    /// The event the credential is bound to.
    pub event_id: EventId,
    /// Scope class of the credential.
    pub scope: TokenScope,
    /// What the audience may do.
    pub capabilities: Capabilities,
    /// The requested page.
    pub gallery: GalleryPage,
    /// Print catalog, when requested and available.
    pub catalog: Option<Vec<CatalogEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_to_bounds() {
        let req = PageRequest::new(0, 500).clamped(100);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 100);

        let req = PageRequest::new(3, 0).clamped(100);
        assert_eq!(req.limit, 1);
    }

    #[test]
    fn page_offset() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 25).offset(), 50);
    }

    #[test]
    fn empty_page_keeps_request_shape() {
        let page = GalleryPage::empty(PageRequest::new(4, 20));
        assert_eq!(page.page, 4);
        assert_eq!(page.limit, 20);
        assert_eq!(page.total, 0);
        assert!(!page.has_more);
        assert!(page.items.is_empty());
    }
}
