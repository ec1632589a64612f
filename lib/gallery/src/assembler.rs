//! Scoped gallery assembly.
//!
//! The asset query scope is derived exclusively from the validated access
//! context. Caller-supplied filters narrow the query; a filter that points
//! outside the credential's slice produces an empty page rather than an
//! error, so callers cannot probe for the existence of media they cannot
//! see.

use std::sync::Arc;
use tracing::{debug, instrument, warn};
use velvet_shutter_access::ResolvedAccessContext;
use velvet_shutter_core::AssetId;
use velvet_shutter_media::{SecureUrlIssuer, SignedUrl, masked};

use crate::error::GalleryError;
use crate::store::{AssetQuery, AssetStore, GalleryRecord};
use crate::view::{GalleryFilters, GalleryPage, PageRequest, PhotoView};

/// Assembles scoped, paginated gallery pages.
pub struct GalleryAssembler {
    store: Arc<dyn AssetStore>,
    issuer: Arc<SecureUrlIssuer>,
    url_expiry: chrono::Duration,
    download_expiry: chrono::Duration,
}

impl GalleryAssembler {
    /// Creates an assembler over the given store and URL issuer.
    #[must_use]
    pub fn new(
        store: Arc<dyn AssetStore>,
        issuer: Arc<SecureUrlIssuer>,
        url_expiry: chrono::Duration,
        download_expiry: chrono::Duration,
    ) -> Self {
        Self {
            store,
            issuer,
            url_expiry,
            download_expiry,
        }
    }

    /// Fetches one gallery page for a validated context.
    ///
    /// # Errors
    ///
    /// Fails only on asset store errors; per-asset URL issuance failures
    /// degrade that asset's URL fields to `None`.
    #[instrument(skip_all, fields(token = %ctx.token_id, page = page.page))]
    pub async fn assemble(
        &self,
        ctx: &ResolvedAccessContext,
        page: PageRequest,
        filters: &GalleryFilters,
    ) -> Result<GalleryPage, GalleryError> {
        let Some(query) = self.build_query(ctx, filters) else {
            debug!("filters fall outside the credential scope, serving empty page");
            return Ok(GalleryPage::empty(page));
        };

        let result = self.store.query_page(&query, page.page, page.limit).await?;
        let total = result.total;
        // Derived from the same snapshot as `total`.
        let has_more = page.offset() + (result.items.len() as u64) < total;

        let mut items = Vec::with_capacity(result.items.len());
        for record in &result.items {
            items.push(self.to_view(ctx, record).await);
        }

        Ok(GalleryPage {
            items,
            total,
            page: page.page,
            limit: page.limit,
            has_more,
        })
    }

    /// Issues a terminal download URL for a single photo.
    ///
    /// # Errors
    ///
    /// `ScopeViolation` when the audience cannot download or the photo is
    /// outside its slice; signer failures propagate.
    #[instrument(skip_all, fields(token = %ctx.token_id))]
    pub async fn single_download(
        &self,
        ctx: &ResolvedAccessContext,
        photo_id: AssetId,
    ) -> Result<SignedUrl, GalleryError> {
        if !ctx.capabilities.can_download {
            return Err(GalleryError::ScopeViolation);
        }
        if !ctx.allows_photo(photo_id) {
            return Err(GalleryError::ScopeViolation);
        }

        let mut query = AssetQuery::scoped(ctx.gallery_scope());
        query.photo_id = Some(photo_id);
        query.allowlist = ctx.share.photo_allowlist.clone();

        let result = self.store.query_page(&query, 1, 1).await?;
        let record = result.items.first().ok_or(GalleryError::ScopeViolation)?;

        Ok(self
            .issuer
            .download_url(&record.asset, self.download_expiry)
            .await?)
    }

    /// Builds the store query, or `None` when the filters point outside the
    /// credential's slice.
    fn build_query(
        &self,
        ctx: &ResolvedAccessContext,
        filters: &GalleryFilters,
    ) -> Option<AssetQuery> {
        // A bound folder is part of the scope itself; a caller naming a
        // different folder gets nothing, not an error.
        if let (Some(bound), Some(requested)) = (ctx.folder_id, filters.folder_id) {
            if bound != requested {
                return None;
            }
        }

        if let Some(photo_id) = filters.photo_id {
            if !ctx.allows_photo(photo_id) {
                return None;
            }
        }

        let mut query = AssetQuery::scoped(ctx.gallery_scope());
        query.folder_id = filters.folder_id;
        query.photo_id = filters.photo_id;
        query.search_term = filters.search_term.clone();
        query.allowlist = ctx.share.photo_allowlist.clone();
        Some(query)
    }

    /// Maps one record to its delivered view, degrading URL fields on
    /// per-asset issuance failures.
    async fn to_view(&self, ctx: &ResolvedAccessContext, record: &GalleryRecord) -> PhotoView {
        let asset = &record.asset;

        let preview_url = match self.issuer.preview_url(asset, self.url_expiry, false).await {
            Ok(signed) => Some(signed.url),
            Err(e) => {
                warn!(file = %masked(&asset.filename), error = %e, "preview issuance degraded");
                None
            }
        };

        let signed_url = match self.issuer.preview_url(asset, self.url_expiry, true).await {
            Ok(signed) => Some(signed.url),
            Err(e) => {
                warn!(file = %masked(&asset.filename), error = %e, "view issuance degraded");
                None
            }
        };

        let download_url = if ctx.capabilities.can_download {
            match self.issuer.download_url(asset, self.download_expiry).await {
                Ok(signed) => Some(signed.url),
                Err(e) => {
                    warn!(file = %masked(&asset.filename), error = %e, "download issuance degraded");
                    None
                }
            }
        } else {
            None
        };

        PhotoView {
            id: asset.id,
            filename: asset.filename.clone(),
            preview_url,
            signed_url,
            download_url,
            created_at: asset.created_at,
            size: asset.file_size,
            mime_type: asset.mime_type.clone(),
            folder_id: asset.folder_id,
            origin: record.origin,
            assignment_id: record.assignment_id,
        }
    }
}
