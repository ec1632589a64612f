//! Per-scope rate limiting over the counter store.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;
use velvet_shutter_access::TokenScope;
use velvet_shutter_core::TokenId;

use crate::counter::{Counter, CounterError};

/// Rate limit configuration for one audience class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration in seconds.
    pub window_seconds: u32,
}

impl RateLimitConfig {
    /// Creates a new rate limit configuration.
    #[must_use]
    pub fn new(max_requests: u32, window_seconds: u32) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    /// Common limit: requests per minute.
    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 60)
    }

    /// Returns the window as a duration.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::seconds(i64::from(self.window_seconds))
    }
}

/// Per-scope throttle policy.
///
/// Public share audiences are throttled tighter than families; family
/// tokens are keyed by token alone since one family may browse from several
/// devices behind one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlePolicy {
    /// Limit for public share tokens.
    pub share: RateLimitConfig,
    /// Limit for family tokens.
    pub family: RateLimitConfig,
    /// Limit for every other scope.
    pub default: RateLimitConfig,
}

impl ThrottlePolicy {
    /// Returns the config for a scope.
    #[must_use]
    pub fn config_for(&self, scope: TokenScope) -> RateLimitConfig {
        match scope {
            TokenScope::Share => self.share,
            TokenScope::Family | TokenScope::LegacySubject => self.family,
            TokenScope::Event | TokenScope::Course => self.default,
        }
    }

    /// Returns true if the scope is keyed by token alone (no caller IP).
    #[must_use]
    pub fn keyed_by_token_only(&self, scope: TokenScope) -> bool {
        matches!(scope, TokenScope::Family | TokenScope::LegacySubject)
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            share: RateLimitConfig::per_minute(60),
            family: RateLimitConfig::per_minute(120),
            default: RateLimitConfig::per_minute(120),
        }
    }
}

/// Counter key for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    /// The validated token.
    pub token_id: TokenId,
    /// Caller IP; omitted for private family tokens.
    pub ip: Option<IpAddr>,
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            Some(ip) => write!(f, "{}@{ip}", self.token_id),
            None => write!(f, "{}", self.token_id),
        }
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed.
    Allowed {
        remaining: u32,
        resets_at: DateTime<Utc>,
    },
    /// Rate limit exceeded.
    Exceeded {
        retry_after: Duration,
        resets_at: DateTime<Utc>,
    },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Returns the number of remaining requests (0 if exceeded).
    #[must_use]
    pub fn remaining(&self) -> u32 {
        match self {
            Self::Allowed { remaining, .. } => *remaining,
            Self::Exceeded { .. } => 0,
        }
    }
}

/// A rate limiter over an injected counter store.
#[derive(Clone)]
pub struct RateLimiter {
    counter: Arc<dyn Counter>,
    policy: ThrottlePolicy,
}

impl RateLimiter {
    /// Creates a new rate limiter with the given counter and policy.
    #[must_use]
    pub fn new(counter: Arc<dyn Counter>, policy: ThrottlePolicy) -> Self {
        Self { counter, policy }
    }

    /// Returns the active policy.
    #[must_use]
    pub fn policy(&self) -> &ThrottlePolicy {
        &self.policy
    }

    /// Counts one request and checks it against the scope's limit.
    ///
    /// # Errors
    ///
    /// Returns an error only when the counter store is unavailable; an
    /// over-limit request is a `RateLimitResult::Exceeded`, not an error.
    pub async fn check_and_increment(
        &self,
        scope: TokenScope,
        token_id: TokenId,
        ip: Option<IpAddr>,
    ) -> Result<RateLimitResult, CounterError> {
        let config = self.policy.config_for(scope);
        let key = RateKey {
            token_id,
            ip: if self.policy.keyed_by_token_only(scope) {
                None
            } else {
                ip
            },
        };

        let state = self
            .counter
            .increment(&key.to_string(), config.window())
            .await?;

        let now = Utc::now();
        let resets_at = state.window_start + config.window();

        if state.count > config.max_requests {
            let retry_after = resets_at - now;
            debug!(%key, scope = %scope, count = state.count, "rate limited");
            return Ok(RateLimitResult::Exceeded {
                retry_after,
                resets_at,
            });
        }

        Ok(RateLimitResult::Allowed {
            remaining: config.max_requests - state.count,
            resets_at,
        })
    }
}
