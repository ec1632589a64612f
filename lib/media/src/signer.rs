//! Time-bounded signed URL issuance.
//!
//! Fallback precedence for preview-class requests: watermark rendition,
//! then unwatermarked preview (when the caller allows it), then refusal.
//! The source `storage_path` is never used in a preview context. Download-
//! class issuance may use the source path, but only after the
//! path-classification guard confirms it is not a processed artifact under
//! an original-looking name.
//!
//! All refusals and fallbacks are logged with filenames masked.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::asset::{Asset, looks_processed, masked};
use crate::error::{BlobError, UrlError};

/// Trait for signed URL creation against object storage.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Creates a time-bounded URL for an object.
    async fn create_signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, BlobError>;
}

/// Bucket names used for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Bucket holding processed renditions.
    pub preview_bucket: String,
    /// Bucket holding full-resolution sources.
    pub original_bucket: String,
    /// Previous rendition bucket name, tried once on a miss to tolerate
    /// bucket-rename migrations.
    pub legacy_preview_bucket: Option<String>,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            preview_bucket: "gallery-previews".to_string(),
            original_bucket: "gallery-originals".to_string(),
            legacy_preview_bucket: None,
        }
    }
}

/// Which rendition a signed URL was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlSource {
    /// Watermarked rendition.
    Watermark,
    /// Unwatermarked processed rendition.
    Preview,
    /// Full-resolution source (download-class only).
    Original,
}

/// A time-bounded URL for one rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    /// The signed URL.
    pub url: String,
    /// When the URL stops working.
    pub expires_at: DateTime<Utc>,
    /// Which rendition was signed.
    pub source: UrlSource,
}

/// Issues signed URLs under the watermark-first, original-never policy.
pub struct SecureUrlIssuer {
    storage: Arc<dyn BlobStorage>,
    buckets: BucketConfig,
}

impl SecureUrlIssuer {
    /// Creates an issuer over the given storage and bucket config.
    #[must_use]
    pub fn new(storage: Arc<dyn BlobStorage>, buckets: BucketConfig) -> Self {
        Self { storage, buckets }
    }

    /// Issues a preview-class URL for an asset.
    ///
    /// Precedence: watermark rendition, then (when `allow_preview_fallback`)
    /// the unwatermarked preview. The source path is never considered.
    ///
    /// # Errors
    ///
    /// `NoSafePath` when no processed rendition exists, `ObjectMissing` when
    /// the selected rendition is gone from storage.
    pub async fn preview_url(
        &self,
        asset: &Asset,
        expiry: Duration,
        allow_preview_fallback: bool,
    ) -> Result<SignedUrl, UrlError> {
        if let Some(key) = &asset.watermark_path {
            return self.sign(key, expiry, UrlSource::Watermark).await;
        }

        if allow_preview_fallback {
            if let Some(key) = &asset.preview_path {
                debug!(file = %masked(&asset.filename), "watermark missing, using preview rendition");
                return self.sign(key, expiry, UrlSource::Preview).await;
            }
        }

        warn!(file = %masked(&asset.filename), "no safe rendition, refusing preview URL");
        Err(UrlError::NoSafePath)
    }

    /// Issues a download-class URL for an asset's source file.
    ///
    /// Only called for explicit, permission-checked download requests. A
    /// source path that matches the processed-artifact naming pattern is
    /// refused and routed through the preview chain instead; the explicit
    /// rendition fields stay authoritative.
    pub async fn download_url(
        &self,
        asset: &Asset,
        expiry: Duration,
    ) -> Result<SignedUrl, UrlError> {
        if looks_processed(&asset.storage_path) {
            warn!(
                file = %masked(&asset.filename),
                "source path matches processed-artifact pattern, refusing original issuance"
            );
            return self.preview_url(asset, expiry, true).await;
        }

        self.sign(&asset.storage_path, expiry, UrlSource::Original)
            .await
    }

    /// Signs one storage key, inferring the bucket from the key shape.
    ///
    /// A miss against the preview bucket is retried once against the legacy
    /// preview bucket when one is configured.
    async fn sign(
        &self,
        key: &str,
        expiry: Duration,
        source: UrlSource,
    ) -> Result<SignedUrl, UrlError> {
        let bucket = if looks_processed(key) {
            &self.buckets.preview_bucket
        } else {
            &self.buckets.original_bucket
        };

        let url = match self.storage.create_signed_url(bucket, key, expiry).await {
            Ok(url) => url,
            Err(BlobError::NotFound) => {
                let legacy = self
                    .buckets
                    .legacy_preview_bucket
                    .as_deref()
                    .filter(|_| bucket == &self.buckets.preview_bucket);
                match legacy {
                    Some(legacy_bucket) => {
                        debug!(bucket = legacy_bucket, "rendition missing, retrying legacy bucket");
                        self.storage
                            .create_signed_url(legacy_bucket, key, expiry)
                            .await
                            .map_err(|e| match e {
                                BlobError::NotFound => UrlError::ObjectMissing,
                                BlobError::Unavailable { reason } => UrlError::Storage { reason },
                            })?
                    }
                    None => return Err(UrlError::ObjectMissing),
                }
            }
            Err(BlobError::Unavailable { reason }) => return Err(UrlError::Storage { reason }),
        };

        Ok(SignedUrl {
            url,
            expires_at: Utc::now() + expiry,
            source,
        })
    }
}
