//! Token record validation.
//!
//! Validation executes in a fixed short-circuiting order: existence,
//! activity, expiry, view limit. Only after all four pass is the share
//! password (when configured) checked, the view count incremented, and the
//! audit entry appended. The two writes are best-effort: their failures are
//! logged and never fail the read path, which bounds but does not eliminate
//! view-limit overshoot under concurrent hits.

use chrono::Utc;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

use crate::audit::{AccessLogEntry, AuditSink};
use crate::context::ResolvedAccessContext;
use crate::error::ValidationError;
use crate::resolver::RequestContext;
use crate::store::TokenStore;
use crate::token::{TokenBinding, TokenHash};

/// Validates presented token values against the token store.
pub struct AccessValidator {
    store: Arc<dyn TokenStore>,
    audit: Arc<dyn AuditSink>,
}

impl AccessValidator {
    /// Creates a validator over the given store and audit sink.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Validates a token value and produces the canonical access context.
    ///
    /// # Errors
    ///
    /// Returns the first failing check in order: `InvalidToken`,
    /// `InactiveToken`, `ExpiredToken`, `ViewLimitExceeded`, then
    /// `PasswordRequired` for password-protected shares.
    #[instrument(skip_all)]
    pub async fn validate(
        &self,
        token_value: &str,
        password: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<ResolvedAccessContext, ValidationError> {
        let hash = TokenHash::digest(token_value);

        let token = self
            .store
            .find_by_hash(&hash)
            .await
            .map_err(|e| ValidationError::Store {
                reason: e.to_string(),
            })?
            .ok_or(ValidationError::InvalidToken)?;

        // Re-verify the digest after the map lookup; the map is not
        // constant-time over the full record set.
        if !bool::from(token.hash.as_bytes().ct_eq(hash.as_bytes())) {
            return Err(ValidationError::InvalidToken);
        }

        if !token.is_active {
            return Err(ValidationError::InactiveToken);
        }
        if token.is_expired_at(Utc::now()) {
            return Err(ValidationError::ExpiredToken);
        }
        if token.views_exhausted() {
            return Err(ValidationError::ViewLimitExceeded);
        }

        if let TokenBinding::Share { settings, .. } = &token.binding {
            if let Some(expected) = &settings.password_hash {
                let presented = password.map(TokenHash::digest);
                let matches = presented
                    .map(|p| bool::from(p.as_bytes().ct_eq(expected.as_bytes())))
                    .unwrap_or(false);
                if !matches {
                    return Err(ValidationError::PasswordRequired);
                }
            }
        }

        // Best-effort bookkeeping; neither write gates the response.
        if let Err(e) = self.store.increment_view_count(token.id).await {
            warn!(token = %token.id, error = %e, "view count increment failed");
        }
        if let Err(e) = self
            .audit
            .record(AccessLogEntry::new(token.id, ctx))
            .await
        {
            warn!(token = %token.id, error = %e, "audit append failed");
        }

        debug!(token = %token.id, scope = %token.scope(), "token validated");
        Ok(ResolvedAccessContext::from_token(&token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::store::InMemoryTokenStore;
    use crate::token::{AccessToken, ShareSettings, TokenScope};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;
    use velvet_shutter_core::{EventId, SubjectId};

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<AccessLogEntry>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, entry: AccessLogEntry) -> Result<(), AuditError> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _entry: AccessLogEntry) -> Result<(), AuditError> {
            Err(AuditError::Io {
                reason: "disk full".to_string(),
            })
        }
    }

    fn validator_with(
        store: Arc<InMemoryTokenStore>,
    ) -> (AccessValidator, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (
            AccessValidator::new(store, Arc::clone(&sink) as Arc<dyn AuditSink>),
            sink,
        )
    }

    fn event_token(value: &str) -> AccessToken {
        AccessToken::new(
            value,
            TokenBinding::Event {
                event_id: EventId::new(),
            },
        )
    }

    #[tokio::test]
    async fn unknown_value_is_invalid() {
        let store = Arc::new(InMemoryTokenStore::new());
        let (validator, _) = validator_with(store);
        let err = validator
            .validate("no-such-token-000000000", None, &RequestContext::new())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidToken);
    }

    #[tokio::test]
    async fn inactive_token_is_rejected_before_expiry() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.insert(
            event_token("tk-value-1234567890ab")
                .deactivated()
                .with_expiry(Utc::now() - Duration::hours(1)),
        );
        let (validator, _) = validator_with(store);
        let err = validator
            .validate("tk-value-1234567890ab", None, &RequestContext::new())
            .await
            .unwrap_err();
        // Activity is checked before expiry in the fixed order.
        assert_eq!(err, ValidationError::InactiveToken);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_on_every_attempt() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.insert(
            event_token("tk-value-1234567890ab").with_expiry(Utc::now() - Duration::seconds(1)),
        );
        let (validator, _) = validator_with(Arc::clone(&store));
        for _ in 0..3 {
            let err = validator
                .validate("tk-value-1234567890ab", None, &RequestContext::new())
                .await
                .unwrap_err();
            assert_eq!(err, ValidationError::ExpiredToken);
        }
    }

    #[tokio::test]
    async fn view_limit_is_enforced() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.insert(event_token("tk-value-1234567890ab").with_max_views(2));
        let (validator, _) = validator_with(Arc::clone(&store));

        for _ in 0..2 {
            validator
                .validate("tk-value-1234567890ab", None, &RequestContext::new())
                .await
                .expect("within limit");
        }
        let err = validator
            .validate("tk-value-1234567890ab", None, &RequestContext::new())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::ViewLimitExceeded);
    }

    #[tokio::test]
    async fn successful_validation_increments_and_audits() {
        let store = Arc::new(InMemoryTokenStore::new());
        let token = event_token("tk-value-1234567890ab");
        let id = token.id;
        store.insert(token);
        let (validator, sink) = validator_with(Arc::clone(&store));

        let ctx = RequestContext::new()
            .with_ip("203.0.113.9".parse().expect("ip"))
            .with_user_agent("gallery-web/2.1");
        let resolved = validator
            .validate("tk-value-1234567890ab", None, &ctx)
            .await
            .expect("valid");

        assert_eq!(resolved.token_id, id);
        assert_eq!(store.get(id).expect("record").view_count, 1);

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].token_id, id);
        assert_eq!(entries[0].user_agent.as_deref(), Some("gallery-web/2.1"));
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_the_read_path() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.insert(event_token("tk-value-1234567890ab"));
        let validator = AccessValidator::new(store, Arc::new(FailingSink));

        validator
            .validate("tk-value-1234567890ab", None, &RequestContext::new())
            .await
            .expect("audit failure must not surface");
    }

    #[tokio::test]
    async fn legacy_token_produces_family_context() {
        let store = Arc::new(InMemoryTokenStore::new());
        let subject_id = SubjectId::new();
        store.insert(AccessToken::new(
            "legacy-9f2b-000000000000",
            TokenBinding::LegacySubject {
                event_id: EventId::new(),
                subject_id,
                source: "photodesk-v1".to_string(),
            },
        ));
        let (validator, _) = validator_with(store);

        let resolved = validator
            .validate("legacy-9f2b-000000000000", None, &RequestContext::new())
            .await
            .expect("valid");
        assert_eq!(resolved.scope, TokenScope::Family);
        assert_eq!(resolved.subject_id, Some(subject_id));
    }

    #[tokio::test]
    async fn share_password_is_required_and_checked() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.insert(AccessToken::new(
            "share-value-1234567890",
            TokenBinding::Share {
                event_id: EventId::new(),
                folder_id: None,
                settings: ShareSettings::view_only().with_password("sunset"),
            },
        ));
        let (validator, _) = validator_with(store);

        let missing = validator
            .validate("share-value-1234567890", None, &RequestContext::new())
            .await
            .unwrap_err();
        assert_eq!(missing, ValidationError::PasswordRequired);

        let wrong = validator
            .validate(
                "share-value-1234567890",
                Some("sunrise"),
                &RequestContext::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(wrong, ValidationError::PasswordRequired);

        validator
            .validate(
                "share-value-1234567890",
                Some("sunset"),
                &RequestContext::new(),
            )
            .await
            .expect("correct password");
    }

    #[tokio::test]
    async fn concurrent_hits_overshoot_at_most_by_concurrency() {
        let store = Arc::new(InMemoryTokenStore::new());
        let token = event_token("tk-value-1234567890ab").with_max_views(1);
        let id = token.id;
        store.insert(token);
        let (validator, _) = validator_with(Arc::clone(&store));
        let validator = Arc::new(validator);

        let concurrency = 8;
        let mut handles = Vec::new();
        for _ in 0..concurrency {
            let v = Arc::clone(&validator);
            handles.push(tokio::spawn(async move {
                v.validate("tk-value-1234567890ab", None, &RequestContext::new())
                    .await
                    .is_ok()
            }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.expect("join") {
                successes += 1;
            }
        }

        // The increment is fire-and-forget, so overshoot is bounded by the
        // degree of concurrency, never more.
        assert!(successes >= 1);
        assert!(successes <= concurrency);
        let count = store.get(id).expect("record").view_count;
        assert!(count as usize <= concurrency);
    }
}
