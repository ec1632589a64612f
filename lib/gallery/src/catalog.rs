//! Print catalog enrichment.
//!
//! Catalog data is decorative for the read path: a fetch failure degrades
//! the field to `None` with a logged warning and never fails the response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use velvet_shutter_core::{CatalogItemId, EventId};

/// One purchasable print product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Unique identifier.
    pub id: CatalogItemId,
    /// Display label.
    pub label: String,
    /// Price in minor units.
    pub price_cents: u32,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Explicit ordering within the storefront.
    pub sort_order: i32,
}

/// Errors from the catalog service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog backend failed to answer.
    Unavailable { reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "catalog unavailable: {reason}"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Trait for per-event catalog lookup.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetches the catalog for an event.
    async fn catalog_for_event(&self, event_id: EventId) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Merges catalog data into gallery responses, degrading on failure.
pub struct CatalogEnricher {
    service: Arc<dyn CatalogService>,
}

impl CatalogEnricher {
    /// Creates an enricher over the given catalog service.
    #[must_use]
    pub fn new(service: Arc<dyn CatalogService>) -> Self {
        Self { service }
    }

    /// Fetches and sorts the catalog; `None` on any failure.
    pub async fn fetch(&self, event_id: EventId) -> Option<Vec<CatalogEntry>> {
        match self.service.catalog_for_event(event_id).await {
            Ok(mut entries) => {
                entries.sort_by(|a, b| {
                    a.sort_order
                        .cmp(&b.sort_order)
                        .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
                });
                Some(entries)
            }
            Err(e) => {
                warn!(event = %event_id, error = %e, "catalog fetch failed, degrading to none");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCatalog {
        entries: Vec<CatalogEntry>,
    }

    #[async_trait]
    impl CatalogService for FixedCatalog {
        async fn catalog_for_event(
            &self,
            _event_id: EventId,
        ) -> Result<Vec<CatalogEntry>, CatalogError> {
            Ok(self.entries.clone())
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl CatalogService for BrokenCatalog {
        async fn catalog_for_event(
            &self,
            _event_id: EventId,
        ) -> Result<Vec<CatalogEntry>, CatalogError> {
            Err(CatalogError::Unavailable {
                reason: "upstream 503".to_string(),
            })
        }
    }

    fn entry(label: &str, sort_order: i32) -> CatalogEntry {
        CatalogEntry {
            id: CatalogItemId::new(),
            label: label.to_string(),
            price_cents: 1500,
            currency: "EUR".to_string(),
            sort_order,
        }
    }

    #[tokio::test]
    async fn entries_sort_by_order_then_label() {
        let enricher = CatalogEnricher::new(Arc::new(FixedCatalog {
            entries: vec![entry("Poster", 2), entry("canvas", 1), entry("Album", 1)],
        }));

        let sorted = enricher.fetch(EventId::new()).await.expect("catalog");
        let labels: Vec<_> = sorted.iter().map(|e| e.label.as_str()).collect();
        // Same sort_order ties break alphabetically, case-insensitive.
        assert_eq!(labels, vec!["Album", "canvas", "Poster"]);
    }

    #[tokio::test]
    async fn failure_degrades_to_none() {
        let enricher = CatalogEnricher::new(Arc::new(BrokenCatalog));
        assert!(enricher.fetch(EventId::new()).await.is_none());
    }
}
