//! Core domain types and utilities for the velvet-shutter platform.
//!
//! This crate provides the foundational types, error handling, and shared
//! utilities used throughout the velvet-shutter photo delivery engine.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{AssetId, AssignmentId, CatalogItemId, EventId, FolderId, SubjectId, TokenId};
