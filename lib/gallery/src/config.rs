//! Engine configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables, with defaults suitable for development.

use serde::Deserialize;
use velvet_shutter_media::BucketConfig;
use velvet_shutter_throttle::ThrottlePolicy;

/// Configuration for the resolution pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Lifetime of preview-class signed URLs, in seconds.
    #[serde(default = "default_url_expiry_seconds")]
    pub url_expiry_seconds: i64,

    /// Lifetime of download-class signed URLs, in seconds.
    /// Shorter than previews: downloads are one-shot actions.
    #[serde(default = "default_download_expiry_seconds")]
    pub download_expiry_seconds: i64,

    /// Page size when the caller names none.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Hard cap on caller-supplied page sizes.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Storage bucket names.
    #[serde(default)]
    pub buckets: BucketConfig,

    /// Per-scope request limits.
    #[serde(default)]
    pub throttle: ThrottlePolicy,
}

fn default_url_expiry_seconds() -> i64 {
    900
}

fn default_download_expiry_seconds() -> i64 {
    300
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    100
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url_expiry_seconds: default_url_expiry_seconds(),
            download_expiry_seconds: default_download_expiry_seconds(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            buckets: BucketConfig::default(),
            throttle: ThrottlePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if present configuration is invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Preview URL lifetime as a duration.
    #[must_use]
    pub fn url_expiry(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.url_expiry_seconds)
    }

    /// Download URL lifetime as a duration.
    #[must_use]
    pub fn download_expiry(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.download_expiry_seconds)
    }
}
