//! Media asset records and path classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use velvet_shutter_core::{AssetId, FolderId};

/// Processing state of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// Source file received, renditions not yet produced.
    Uploaded,
    /// Rendition pipeline in progress.
    Processing,
    /// Renditions available.
    Ready,
    /// Rendition pipeline failed.
    Failed,
}

/// How an asset entered the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetOrigin {
    /// Uploaded by event staff.
    Staff,
    /// Uploaded through a guest/share surface.
    Guest,
    /// Imported from a previous system.
    Import,
}

/// A media asset record.
///
/// `storage_path` points at the full-resolution source and is never served
/// for preview-class requests; `watermark_path` and `preview_path` are the
/// processed renditions produced by the (external) rendition pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier.
    pub id: AssetId,
    /// Original filename as uploaded.
    pub filename: String,
    /// Storage key of the full-resolution source.
    pub storage_path: String,
    /// Storage key of the unwatermarked processed rendition.
    pub preview_path: Option<String>,
    /// Storage key of the watermarked rendition.
    pub watermark_path: Option<String>,
    /// Source file size in bytes.
    pub file_size: u64,
    /// MIME type of the source.
    pub mime_type: String,
    /// Processing state.
    pub status: AssetStatus,
    /// Folder the asset belongs to.
    pub folder_id: FolderId,
    /// When the asset was created.
    pub created_at: DateTime<Utc>,
    /// Pipeline-defined metadata.
    pub metadata: JsonValue,
}

impl Asset {
    /// Creates a ready asset with only its source path set.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        storage_path: impl Into<String>,
        folder_id: FolderId,
    ) -> Self {
        Self {
            id: AssetId::new(),
            filename: filename.into(),
            storage_path: storage_path.into(),
            preview_path: None,
            watermark_path: None,
            file_size: 0,
            mime_type: "image/jpeg".to_string(),
            status: AssetStatus::Ready,
            folder_id,
            created_at: Utc::now(),
            metadata: JsonValue::Null,
        }
    }

    /// Sets the watermarked rendition key.
    #[must_use]
    pub fn with_watermark(mut self, path: impl Into<String>) -> Self {
        self.watermark_path = Some(path.into());
        self
    }

    /// Sets the unwatermarked rendition key.
    #[must_use]
    pub fn with_preview(mut self, path: impl Into<String>) -> Self {
        self.preview_path = Some(path.into());
        self
    }

    /// Sets the source file size.
    #[must_use]
    pub fn with_size(mut self, bytes: u64) -> Self {
        self.file_size = bytes;
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = mime.into();
        self
    }
}

/// Returns true if a storage key names a processed rendition.
///
/// Naming-pattern heuristic, used for bucket inference and as defense in
/// depth behind the explicit rendition fields. The key layout is
/// `previews/...` for pipeline output and a `-watermark` suffix for stamped
/// files.
#[must_use]
pub fn looks_processed(path: &str) -> bool {
    path.contains("previews/") || path.contains("watermark")
}

/// Masks a filename for logging: a short stem prefix plus the extension.
#[must_use]
pub fn masked(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => {
            let prefix: String = stem.chars().take(3).collect();
            format!("{prefix}***.{ext}")
        }
        None => {
            let prefix: String = filename.chars().take(3).collect();
            format!("{prefix}***")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_builder() {
        let asset = Asset::new("IMG_0131.jpg", "events/evt1/IMG_0131.jpg", FolderId::new())
            .with_watermark("previews/evt1/IMG_0131-watermark.jpg")
            .with_preview("previews/evt1/IMG_0131.jpg")
            .with_size(4_812_003)
            .with_mime_type("image/jpeg");

        assert_eq!(asset.status, AssetStatus::Ready);
        assert!(asset.watermark_path.is_some());
        assert_eq!(asset.file_size, 4_812_003);
    }

    #[test]
    fn processed_path_heuristic() {
        assert!(looks_processed("previews/evt1/IMG_0131.jpg"));
        assert!(looks_processed("evt1/IMG_0131-watermark.jpg"));
        assert!(!looks_processed("events/evt1/IMG_0131.jpg"));
    }

    #[test]
    fn masked_keeps_prefix_and_extension_only() {
        assert_eq!(masked("IMG_0131.jpg"), "IMG***.jpg");
        assert_eq!(masked("x.png"), "x***.png");
        assert_eq!(masked("noextension"), "noe***");
    }

    #[test]
    fn asset_serde_roundtrip() {
        let asset = Asset::new("IMG_0131.jpg", "events/evt1/IMG_0131.jpg", FolderId::new());
        let json = serde_json::to_string(&asset).expect("serialize");
        let parsed: Asset = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(asset, parsed);
    }
}
