//! Gallery assembly and the full resolution pipeline for velvet-shutter.
//!
//! [`GalleryService`] is the inbound surface of the engine: it takes one raw
//! credential plus paging and filter parameters, runs the pipeline
//! (resolve, validate, throttle, assemble, enrich), and returns a
//! [`GalleryResponse`] or a typed error.
//!
//! The critical security invariant lives in [`GalleryAssembler`]: the asset
//! query scope is derived exclusively from the validated access context, so
//! caller-supplied filters can narrow but never escape the credential's
//! bound slice of the library.
//!
//! Cancellation follows the async model: dropping the future returned by
//! [`GalleryService::resolve`] cancels in-flight downstream I/O. Rate-limit
//! increments that already happened are safe to keep.

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod view;

pub use assembler::GalleryAssembler;
pub use catalog::{CatalogEnricher, CatalogEntry, CatalogError, CatalogService};
pub use config::EngineConfig;
pub use error::GalleryError;
pub use service::{GalleryRequest, GalleryService};
pub use store::{AssetPage, AssetQuery, AssetStore, GalleryRecord, InMemoryAssetStore, StoredAsset};
pub use view::{GalleryFilters, GalleryPage, GalleryResponse, PageRequest, PhotoView};
