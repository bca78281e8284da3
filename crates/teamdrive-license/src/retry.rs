//! Bounded exponential-backoff decorator for license authority calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngExt;
use tracing::warn;

use teamdrive_core::config::license::RetryConfig;
use teamdrive_core::types::id::UserId;

use crate::authority::{
    AuthorityError, CheckoutReply, ExternalPoolState, ExternalToken, LicenseAuthority,
};

/// Wraps any [`LicenseAuthority`] with retry-on-unreachable semantics.
///
/// Only `Unreachable` failures are retried; a `Denied` checkout or a
/// protocol fault is final. After the retry budget is exhausted the last
/// error propagates and the caller decides between fail-closed (allocation)
/// and degraded-accept (check-in).
#[derive(Debug, Clone)]
pub struct RetryingAuthority {
    inner: Arc<dyn LicenseAuthority>,
    policy: RetryConfig,
}

impl RetryingAuthority {
    /// Wrap an authority with the given retry policy.
    pub fn new(inner: Arc<dyn LicenseAuthority>, policy: RetryConfig) -> Self {
        Self { inner, policy }
    }

    fn attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Sleep before retry number `attempt` (1-based):
    /// `base * 2^(attempt-1)`, capped at `max_delay_ms`, plus up to 25%
    /// jitter.
    async fn back_off(&self, operation: &str, attempt: u32) {
        let exp = self
            .policy
            .base_delay_ms
            .saturating_mul(1u64 << (attempt - 1).min(16));
        let capped = exp.min(self.policy.max_delay_ms);
        let jitter = rand::rng().random_range(0..=capped / 4);
        let delay = Duration::from_millis(capped + jitter);

        warn!(
            operation = operation,
            attempt = attempt,
            backoff_ms = delay.as_millis() as u64,
            "Retrying license authority call"
        );
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl LicenseAuthority for RetryingAuthority {
    async fn checkout(
        &self,
        user_id: UserId,
        feature_name: &str,
    ) -> Result<CheckoutReply, AuthorityError> {
        let mut last_error = None;

        for attempt in 0..self.attempts() {
            if attempt > 0 {
                self.back_off("checkout", attempt).await;
            }

            match self.inner.checkout(user_id, feature_name).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_unreachable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(exhausted(last_error))
    }

    async fn checkin(&self, token: &ExternalToken) -> Result<(), AuthorityError> {
        let mut last_error = None;

        for attempt in 0..self.attempts() {
            if attempt > 0 {
                self.back_off("checkin", attempt).await;
            }

            match self.inner.checkin(token).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unreachable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(exhausted(last_error))
    }

    async fn report_state(&self, feature_name: &str) -> Result<ExternalPoolState, AuthorityError> {
        let mut last_error = None;

        for attempt in 0..self.attempts() {
            if attempt > 0 {
                self.back_off("report_state", attempt).await;
            }

            match self.inner.report_state(feature_name).await {
                Ok(state) => return Ok(state),
                Err(e) if e.is_unreachable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(exhausted(last_error))
    }
}

fn exhausted(last_error: Option<AuthorityError>) -> AuthorityError {
    last_error
        .unwrap_or_else(|| AuthorityError::Unreachable("retry budget exhausted".to_string()))
}
