//! Append-only access logging.
//!
//! Every successful validation produces one [`AccessLogEntry`]. The sink is
//! fire-and-forget from the caller's point of view: a failed write is logged
//! and never fails the read path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;
use velvet_shutter_core::TokenId;

use crate::error::AuditError;
use crate::resolver::RequestContext;

/// One access log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// The token that was validated.
    pub token_id: TokenId,
    /// Caller IP, when known.
    pub ip: Option<IpAddr>,
    /// Caller user agent, when known.
    pub user_agent: Option<String>,
    /// When the validation happened.
    pub timestamp: DateTime<Utc>,
}

impl AccessLogEntry {
    /// Creates an entry for the current instant.
    #[must_use]
    pub fn new(token_id: TokenId, ctx: &RequestContext) -> Self {
        Self {
            token_id,
            ip: ctx.ip,
            user_agent: ctx.user_agent.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Trait for the append-only access log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one entry.
    async fn record(&self, entry: AccessLogEntry) -> Result<(), AuditError>;
}

/// Newline-delimited JSON audit sink.
///
/// Appends one JSON object per line to a local file. Suitable for
/// single-process deployments and tests; larger installations inject a sink
/// that forwards to their log pipeline.
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Creates a sink appending to the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, entry: AccessLogEntry) -> Result<(), AuditError> {
        let line = serde_json::to_string(&entry).map_err(|e| AuditError::Serialize {
            reason: e.to_string(),
        })?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::Io {
                reason: e.to_string(),
            })?;
        writeln!(file, "{line}").map_err(|e| AuditError::Io {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
