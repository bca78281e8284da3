//! Per-user session limit override entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use teamdrive_core::types::id::UserId;
use teamdrive_core::types::session_limit::SessionLimit;

/// A per-user override for the concurrent session limit.
///
/// When present, this takes priority over the configured default.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSessionLimit {
    /// The user whose limit is overridden.
    pub user_id: UserId,
    /// Maximum number of concurrent sessions. `0` means unlimited.
    pub max_sessions: i32,
    /// Reason for the override.
    pub reason: Option<String>,
    /// The admin who set this override.
    pub set_by: Option<UserId>,
    /// When the override was created.
    pub created_at: DateTime<Utc>,
    /// When the override was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserSessionLimit {
    /// The resolved limit this override represents.
    pub fn limit(&self) -> SessionLimit {
        SessionLimit::from(self.max_sessions.max(0) as u32)
    }
}
