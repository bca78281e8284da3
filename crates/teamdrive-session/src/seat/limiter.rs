//! Session limit resolution — determines the maximum concurrent sessions
//! for a user.
//!
//! Resolution order:
//! 1. Per-user override (from `user_session_limits` table)
//! 2. Configured default
//!
//! The limit is enforced *before* seat allocation is attempted, so a
//! request destined to be rejected on this axis never touches the pool.

use std::sync::Arc;

use teamdrive_core::config::session::SessionLimitsConfig;
use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::UserId;
use teamdrive_core::types::session_limit::SessionLimit;

use crate::store::SessionLimitStore;

/// Outcome of a session limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    /// The user may open another session.
    Allowed,
    /// The user is at their ceiling and must close another session first.
    LimitExceeded {
        /// The effective limit that was hit.
        max: u32,
    },
}

/// Resolves and enforces per-user concurrent session limits.
#[derive(Debug, Clone)]
pub struct SessionLimiter {
    /// Store for per-user session limit overrides.
    limit_store: Arc<dyn SessionLimitStore>,
    /// Limits configuration.
    config: SessionLimitsConfig,
}

impl SessionLimiter {
    /// Create a new session limiter.
    pub fn new(limit_store: Arc<dyn SessionLimitStore>, config: SessionLimitsConfig) -> Self {
        Self {
            limit_store,
            config,
        }
    }

    /// Resolve the effective session limit for a user.
    pub async fn resolve_limit(&self, user_id: UserId) -> AppResult<SessionLimit> {
        if let Some(user_limit) = self.limit_store.find_by_user(user_id).await? {
            return Ok(user_limit.limit());
        }
        Ok(SessionLimit::from(self.config.default_max_sessions))
    }

    /// Check whether a user with `active_count` live sessions may open
    /// another one.
    pub async fn check_limit(
        &self,
        user_id: UserId,
        active_count: u32,
    ) -> AppResult<LimitDecision> {
        if !self.config.enabled {
            return Ok(LimitDecision::Allowed);
        }

        let limit = self.resolve_limit(user_id).await?;
        if limit.is_exceeded_by(active_count) {
            // resolve_limit never returns an exceeded Unlimited, so as_max
            // is always Some here.
            let max = limit.as_max().unwrap_or(u32::MAX);
            return Ok(LimitDecision::LimitExceeded { max });
        }

        Ok(LimitDecision::Allowed)
    }

    /// Whether session limits are enabled in configuration.
    pub fn limits_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Set a per-user session limit override.
    pub async fn set_user_limit(
        &self,
        user_id: UserId,
        max_sessions: u32,
        reason: Option<&str>,
        set_by: UserId,
    ) -> AppResult<()> {
        self.limit_store
            .upsert(user_id, max_sessions as i32, reason, set_by)
            .await
    }

    /// Remove a per-user session limit override.
    pub async fn remove_user_limit(&self, user_id: UserId) -> AppResult<()> {
        self.limit_store.remove(user_id).await
    }
}
