//! The inbound resolution surface.
//!
//! One call runs the whole pipeline: input normalization, token validation,
//! throttling, scoped assembly, catalog enrichment. Resolver, validator,
//! and limiter failures are terminal for the call; catalog and per-asset
//! URL failures degrade locally.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::instrument;
use velvet_shutter_access::{
    AccessValidator, AliasDirectory, AuditSink, RequestContext, TokenResolver, TokenStore,
};
use velvet_shutter_core::{AssetId, FolderId};
use velvet_shutter_media::{BlobStorage, SecureUrlIssuer, SignedUrl};
use velvet_shutter_throttle::{Counter, RateLimitResult, RateLimiter};

use crate::assembler::GalleryAssembler;
use crate::catalog::{CatalogEnricher, CatalogService};
use crate::config::EngineConfig;
use crate::error::GalleryError;
use crate::store::AssetStore;
use crate::view::{GalleryFilters, GalleryResponse, PageRequest};

/// One inbound resolution request.
#[derive(Debug, Clone, Default)]
pub struct GalleryRequest {
    /// Raw credential: alias, short code, or opaque token.
    pub raw_input: String,
    /// Caller IP, when known.
    pub ip: Option<IpAddr>,
    /// Caller user agent, when known.
    pub user_agent: Option<String>,
    /// Requested page, defaulting to 1.
    pub page: Option<u32>,
    /// Requested page size, defaulting to the configured size.
    pub limit: Option<u32>,
    /// Narrow to a single photo.
    pub photo_id: Option<AssetId>,
    /// Narrow to one folder.
    pub folder_id: Option<FolderId>,
    /// Substring filename search.
    pub search_term: Option<String>,
    /// Share-link password, when the link has one.
    pub password: Option<String>,
    /// Whether to merge the print catalog into the response.
    pub include_catalog: bool,
}

impl GalleryRequest {
    /// Creates a request for a raw credential.
    #[must_use]
    pub fn new(raw_input: impl Into<String>) -> Self {
        Self {
            raw_input: raw_input.into(),
            ..Self::default()
        }
    }

    /// Sets the caller IP.
    #[must_use]
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Sets the page and page size.
    #[must_use]
    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Narrows to a single photo.
    #[must_use]
    pub fn with_photo(mut self, photo_id: AssetId) -> Self {
        self.photo_id = Some(photo_id);
        self
    }

    /// Narrows to one folder.
    #[must_use]
    pub fn with_folder(mut self, folder_id: FolderId) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    /// Sets the share-link password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Requests catalog enrichment.
    #[must_use]
    pub fn with_catalog(mut self) -> Self {
        self.include_catalog = true;
        self
    }
}

/// The resolution pipeline: resolver, validator, limiter, assembler,
/// enricher, wired over injected collaborators.
pub struct GalleryService {
    resolver: TokenResolver,
    validator: AccessValidator,
    limiter: RateLimiter,
    assembler: GalleryAssembler,
    enricher: CatalogEnricher,
    config: EngineConfig,
}

impl GalleryService {
    /// Wires the pipeline from its collaborators and config.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn AliasDirectory>,
        tokens: Arc<dyn TokenStore>,
        audit: Arc<dyn AuditSink>,
        counter: Arc<dyn Counter>,
        assets: Arc<dyn AssetStore>,
        blobs: Arc<dyn BlobStorage>,
        catalog: Arc<dyn CatalogService>,
        config: EngineConfig,
    ) -> Self {
        let issuer = Arc::new(SecureUrlIssuer::new(blobs, config.buckets.clone()));
        Self {
            resolver: TokenResolver::new(directory),
            validator: AccessValidator::new(tokens, audit),
            limiter: RateLimiter::new(counter, config.throttle),
            assembler: GalleryAssembler::new(
                assets,
                issuer,
                config.url_expiry(),
                config.download_expiry(),
            ),
            enricher: CatalogEnricher::new(catalog),
            config,
        }
    }

    /// Resolves one gallery request.
    ///
    /// # Errors
    ///
    /// Resolver, validator, and rate-limiter failures are terminal; see
    /// [`GalleryError`] for the taxonomy.
    #[instrument(skip_all)]
    pub async fn resolve(&self, request: GalleryRequest) -> Result<GalleryResponse, GalleryError> {
        let ctx = self.request_context(&request);

        let input = self.resolver.resolve(&request.raw_input, &ctx).await?;
        let access = self
            .validator
            .validate(&input.token_value, request.password.as_deref(), &ctx)
            .await?;

        match self
            .limiter
            .check_and_increment(access.scope, access.token_id, request.ip)
            .await?
        {
            RateLimitResult::Exceeded { retry_after, .. } => {
                return Err(GalleryError::RateLimited { retry_after });
            }
            RateLimitResult::Allowed { .. } => {}
        }

        let page = PageRequest::new(
            request.page.unwrap_or(1),
            request.limit.unwrap_or(self.config.default_page_size),
        )
        .clamped(self.config.max_page_size);

        let filters = GalleryFilters {
            folder_id: request.folder_id,
            photo_id: request.photo_id,
            search_term: request.search_term.clone(),
        };

        let gallery = self.assembler.assemble(&access, page, &filters).await?;

        let catalog = if request.include_catalog {
            self.enricher.fetch(access.event_id).await
        } else {
            None
        };

        Ok(GalleryResponse {
            event_id: access.event_id,
            scope: access.scope,
            capabilities: access.capabilities,
            gallery,
            catalog,
        })
    }

    /// Resolves a credential and issues one terminal download URL.
    ///
    /// # Errors
    ///
    /// Everything terminal in [`Self::resolve`] plus `ScopeViolation` for
    /// audiences without download capability or photos outside the slice;
    /// signer failures are terminal here.
    #[instrument(skip_all)]
    pub async fn download(
        &self,
        request: GalleryRequest,
        photo_id: AssetId,
    ) -> Result<SignedUrl, GalleryError> {
        let ctx = self.request_context(&request);

        let input = self.resolver.resolve(&request.raw_input, &ctx).await?;
        let access = self
            .validator
            .validate(&input.token_value, request.password.as_deref(), &ctx)
            .await?;

        match self
            .limiter
            .check_and_increment(access.scope, access.token_id, request.ip)
            .await?
        {
            RateLimitResult::Exceeded { retry_after, .. } => {
                return Err(GalleryError::RateLimited { retry_after });
            }
            RateLimitResult::Allowed { .. } => {}
        }

        self.assembler.single_download(&access, photo_id).await
    }

    fn request_context(&self, request: &GalleryRequest) -> RequestContext {
        RequestContext {
            ip: request.ip,
            user_agent: request.user_agent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, CatalogError};
    use crate::store::{InMemoryAssetStore, StoredAsset};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use velvet_shutter_access::{
        AccessLogEntry, AccessToken, AliasRecord, AuditError, DirectoryError, InMemoryTokenStore,
        ShareSettings, TokenBinding, TokenScope, ValidationError,
    };
    use velvet_shutter_core::{CatalogItemId, EventId, SubjectId};
    use velvet_shutter_media::{Asset, BlobError};
    use velvet_shutter_throttle::{InMemoryCounter, RateLimitConfig, ThrottlePolicy};

    struct MapDirectory {
        entries: HashMap<String, String>,
    }

    #[async_trait]
    impl AliasDirectory for MapDirectory {
        async fn lookup(&self, alias: &str) -> Result<Option<AliasRecord>, DirectoryError> {
            Ok(self.entries.get(alias).map(|value| AliasRecord {
                token_value: value.clone(),
                metadata: serde_json::Value::Null,
            }))
        }
    }

    struct NoopSink;

    #[async_trait]
    impl AuditSink for NoopSink {
        async fn record(&self, _entry: AccessLogEntry) -> Result<(), AuditError> {
            Ok(())
        }
    }

    struct SignAll;

    #[async_trait]
    impl BlobStorage for SignAll {
        async fn create_signed_url(
            &self,
            bucket: &str,
            key: &str,
            _ttl: Duration,
        ) -> Result<String, BlobError> {
            Ok(format!("https://cdn.test/{bucket}/{key}"))
        }
    }

    struct FixedCatalog;

    #[async_trait]
    impl CatalogService for FixedCatalog {
        async fn catalog_for_event(
            &self,
            _event_id: EventId,
        ) -> Result<Vec<CatalogEntry>, CatalogError> {
            Ok(vec![
                CatalogEntry {
                    id: CatalogItemId::new(),
                    label: "Poster".to_string(),
                    price_cents: 2400,
                    currency: "EUR".to_string(),
                    sort_order: 2,
                },
                CatalogEntry {
                    id: CatalogItemId::new(),
                    label: "Print 10x15".to_string(),
                    price_cents: 300,
                    currency: "EUR".to_string(),
                    sort_order: 1,
                },
            ])
        }
    }

    struct Harness {
        tokens: Arc<InMemoryTokenStore>,
        assets: Arc<InMemoryAssetStore>,
        aliases: HashMap<String, String>,
        config: EngineConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                tokens: Arc::new(InMemoryTokenStore::new()),
                assets: Arc::new(InMemoryAssetStore::new()),
                aliases: HashMap::new(),
                config: EngineConfig::default(),
            }
        }

        fn service(self) -> GalleryService {
            GalleryService::new(
                Arc::new(MapDirectory {
                    entries: self.aliases,
                }),
                self.tokens,
                Arc::new(NoopSink),
                Arc::new(InMemoryCounter::new()),
                self.assets,
                Arc::new(SignAll),
                Arc::new(FixedCatalog),
                self.config,
            )
        }
    }

    fn festival_asset(folder_id: velvet_shutter_core::FolderId, name: &str) -> Asset {
        Asset::new(name, format!("events/festival/{name}"), folder_id)
            .with_watermark(format!("previews/festival/{name}-watermark.jpg"))
            .with_preview(format!("previews/festival/{name}"))
    }

    #[tokio::test]
    async fn share_token_first_page_serves_watermarked_preview() {
        let harness = Harness::new();
        let event_id = EventId::new();
        let folder_id = velvet_shutter_core::FolderId::new();

        harness.tokens.insert(AccessToken::new(
            "share-token-A-00000000",
            TokenBinding::Share {
                event_id,
                folder_id: None,
                settings: ShareSettings::view_only(),
            },
        ));
        harness.assets.insert(StoredAsset::new(
            festival_asset(folder_id, "IMG_0001.jpg"),
            event_id,
        ));
        harness.assets.insert(StoredAsset::new(
            festival_asset(folder_id, "IMG_0002.jpg"),
            event_id,
        ));
        let service = harness.service();
        let response = service
            .resolve(GalleryRequest::new("share-token-A-00000000").with_page(1, 1))
            .await
            .expect("resolve");

        assert_eq!(response.event_id, event_id);
        assert_eq!(response.scope, TokenScope::Share);
        assert_eq!(response.gallery.items.len(), 1);
        assert_eq!(response.gallery.total, 2);
        assert!(response.gallery.has_more);

        let preview = response.gallery.items[0]
            .preview_url
            .as_deref()
            .expect("preview url");
        assert!(preview.contains("-watermark.jpg"));
        assert!(!preview.contains("events/festival/"));
    }

    #[tokio::test]
    async fn family_token_with_unassigned_photo_returns_empty_items() {
        let harness = Harness::new();
        let event_id = EventId::new();
        let folder_id = velvet_shutter_core::FolderId::new();
        let juan = SubjectId::new();

        harness.tokens.insert(AccessToken::new(
            "family-token-B-0000000",
            TokenBinding::Family {
                event_id,
                subject_id: juan,
            },
        ));

        let unassigned = festival_asset(folder_id, "asset-42.jpg");
        let unassigned_id = unassigned.id;
        harness
            .assets
            .insert(StoredAsset::new(unassigned, event_id));

        let service = harness.service();
        let response = service
            .resolve(GalleryRequest::new("family-token-B-0000000").with_photo(unassigned_id))
            .await
            .expect("no error, just empty");
        assert!(response.gallery.items.is_empty());
    }

    #[tokio::test]
    async fn legacy_token_serves_the_same_shape_as_a_family_token() {
        let harness = Harness::new();
        let event_id = EventId::new();
        let folder_id = velvet_shutter_core::FolderId::new();
        let subject_id = SubjectId::new();

        harness.tokens.insert(AccessToken::new(
            "legacy-token-C-0000000",
            TokenBinding::LegacySubject {
                event_id,
                subject_id,
                source: "photodesk-v1".to_string(),
            },
        ));
        harness.tokens.insert(AccessToken::new(
            "family-token-D-0000000",
            TokenBinding::Family {
                event_id,
                subject_id,
            },
        ));
        harness.assets.insert(
            StoredAsset::new(festival_asset(folder_id, "mine.jpg"), event_id)
                .assigned_to(subject_id),
        );

        let service = harness.service();
        let legacy = service
            .resolve(GalleryRequest::new("legacy-token-C-0000000"))
            .await
            .expect("legacy resolves");
        let native = service
            .resolve(GalleryRequest::new("family-token-D-0000000"))
            .await
            .expect("native resolves");

        assert_eq!(legacy.scope, TokenScope::Family);
        assert_eq!(legacy.scope, native.scope);
        assert_eq!(legacy.capabilities, native.capabilities);
        assert_eq!(legacy.gallery.total, native.gallery.total);
        assert_eq!(
            legacy.gallery.items[0].id,
            native.gallery.items[0].id
        );
    }

    #[tokio::test]
    async fn alias_and_direct_token_resolve_identically() {
        let mut harness = Harness::new();
        let event_id = EventId::new();
        let folder_id = velvet_shutter_core::FolderId::new();

        harness.tokens.insert(AccessToken::new(
            "token-abc-1234567890abcdef",
            TokenBinding::Event { event_id },
        ));
        harness.assets.insert(StoredAsset::new(
            festival_asset(folder_id, "IMG_0001.jpg"),
            event_id,
        ));
        harness
            .aliases
            .insert("luna1234".to_string(), "token-abc-1234567890abcdef".to_string());

        let service = harness.service();
        let via_alias = service
            .resolve(GalleryRequest::new("luna1234"))
            .await
            .expect("alias resolves");
        let direct = service
            .resolve(GalleryRequest::new("token-abc-1234567890abcdef"))
            .await
            .expect("token resolves");

        assert_eq!(via_alias.event_id, direct.event_id);
        assert_eq!(via_alias.scope, direct.scope);
        assert_eq!(via_alias.capabilities, direct.capabilities);
        assert_eq!(via_alias.gallery.total, direct.gallery.total);
    }

    #[tokio::test]
    async fn over_limit_requests_are_rejected_with_retry_after() {
        let mut harness = Harness::new();
        let event_id = EventId::new();
        harness.tokens.insert(AccessToken::new(
            "share-token-A-00000000",
            TokenBinding::Share {
                event_id,
                folder_id: None,
                settings: ShareSettings::view_only(),
            },
        ));
        harness.config.throttle = ThrottlePolicy {
            share: RateLimitConfig::per_minute(2),
            family: RateLimitConfig::per_minute(2),
            default: RateLimitConfig::per_minute(2),
        };

        let service = harness.service();
        for _ in 0..2 {
            service
                .resolve(GalleryRequest::new("share-token-A-00000000"))
                .await
                .expect("within limit");
        }

        let err = service
            .resolve(GalleryRequest::new("share-token-A-00000000"))
            .await
            .unwrap_err();
        match err {
            GalleryError::RateLimited { retry_after } => {
                assert!(retry_after > Duration::zero());
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_token_is_terminal() {
        let harness = Harness::new();
        harness.tokens.insert(
            AccessToken::new(
                "expired-token-00000000",
                TokenBinding::Event {
                    event_id: EventId::new(),
                },
            )
            .with_expiry(Utc::now() - Duration::hours(1)),
        );

        let service = harness.service();
        let err = service
            .resolve(GalleryRequest::new("expired-token-00000000"))
            .await
            .unwrap_err();
        assert_eq!(err, GalleryError::Validation(ValidationError::ExpiredToken));
    }

    #[tokio::test]
    async fn catalog_is_merged_sorted_when_requested() {
        let harness = Harness::new();
        let event_id = EventId::new();
        harness.tokens.insert(AccessToken::new(
            "share-token-A-00000000",
            TokenBinding::Share {
                event_id,
                folder_id: None,
                settings: ShareSettings::view_only(),
            },
        ));

        let service = harness.service();

        let plain = service
            .resolve(GalleryRequest::new("share-token-A-00000000"))
            .await
            .expect("resolve");
        assert!(plain.catalog.is_none());

        let enriched = service
            .resolve(GalleryRequest::new("share-token-A-00000000").with_catalog())
            .await
            .expect("resolve");
        let catalog = enriched.catalog.expect("catalog");
        let labels: Vec<_> = catalog.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Print 10x15", "Poster"]);
    }

    #[tokio::test]
    async fn password_protected_share_requires_the_password() {
        let harness = Harness::new();
        let event_id = EventId::new();
        harness.tokens.insert(AccessToken::new(
            "share-token-P-00000000",
            TokenBinding::Share {
                event_id,
                folder_id: None,
                settings: ShareSettings::view_only().with_password("sunset"),
            },
        ));

        let service = harness.service();
        let err = service
            .resolve(GalleryRequest::new("share-token-P-00000000"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GalleryError::Validation(ValidationError::PasswordRequired)
        );

        service
            .resolve(GalleryRequest::new("share-token-P-00000000").with_password("sunset"))
            .await
            .expect("correct password resolves");
    }

    #[tokio::test]
    async fn download_pipeline_issues_a_source_url() {
        let harness = Harness::new();
        let event_id = EventId::new();
        let subject_id = SubjectId::new();
        let asset = festival_asset(velvet_shutter_core::FolderId::new(), "mine.jpg");
        let asset_id = asset.id;

        harness.tokens.insert(AccessToken::new(
            "family-token-B-0000000",
            TokenBinding::Family {
                event_id,
                subject_id,
            },
        ));
        harness
            .assets
            .insert(StoredAsset::new(asset, event_id).assigned_to(subject_id));

        let service = harness.service();
        let signed = service
            .download(GalleryRequest::new("family-token-B-0000000"), asset_id)
            .await
            .expect("download");
        assert!(signed.url.contains("events/festival/mine.jpg"));
    }

    #[tokio::test]
    async fn pagination_pages_are_disjoint_end_to_end() {
        let harness = Harness::new();
        let event_id = EventId::new();
        let folder_id = velvet_shutter_core::FolderId::new();
        harness.tokens.insert(AccessToken::new(
            "event-token-0000000000",
            TokenBinding::Event { event_id },
        ));
        for i in 0..4 {
            harness.assets.insert(StoredAsset::new(
                festival_asset(folder_id, &format!("IMG_{i:02}.jpg")),
                event_id,
            ));
        }

        let service = harness.service();
        let first = service
            .resolve(GalleryRequest::new("event-token-0000000000").with_page(1, 2))
            .await
            .expect("resolve");
        let second = service
            .resolve(GalleryRequest::new("event-token-0000000000").with_page(2, 2))
            .await
            .expect("resolve");

        let first_ids: Vec<_> = first.gallery.items.iter().map(|v| v.id).collect();
        let second_ids: Vec<_> = second.gallery.items.iter().map(|v| v.id).collect();
        assert_eq!(first_ids.len(), 2);
        assert_eq!(second_ids.len(), 2);
        assert!(first_ids.iter().all(|id| !second_ids.contains(id)));
        assert!(!second.gallery.has_more);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_before_any_lookup() {
        let harness = Harness::new();
        let service = harness.service();
        let err = service.resolve(GalleryRequest::new("  ")).await.unwrap_err();
        assert!(matches!(err, GalleryError::Resolve(_)));
    }
}
