//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use teamdrive_core::types::id::{CheckoutId, SessionId, UserId};

use crate::presence::PresenceStatus;

use super::priority::SessionPriority;

/// An authenticated user session.
///
/// Sessions are created at admission and transition to terminated exactly
/// once (logout, expiry, admin termination, or overflow eviction). They are
/// never hard-deleted; terminated rows are retained for audit and
/// statistics. A live session holds exactly one active seat checkout,
/// unless it was admitted seat-exempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// The user this session belongs to.
    pub user_id: UserId,
    /// SHA-256 hash of the access token.
    pub token_hash: String,
    /// SHA-256 hash of the refresh token (if issued).
    pub refresh_token_hash: Option<String>,
    /// IP address from which the session was created.
    pub ip_address: std::net::IpAddr,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// Parsed device information (JSON).
    pub device_info: Option<serde_json::Value>,
    /// Priority class fixed at admission time.
    pub priority: SessionPriority,

    // -- Seat integration --
    /// The checkout granting this session its seat (None while seat-exempt
    /// or after the checkout row was detached).
    pub checkout_id: Option<CheckoutId>,
    /// When the seat was allocated.
    pub seat_allocated_at: Option<DateTime<Utc>>,
    /// The session that was evicted to make room for this one.
    pub overflow_kicked: Option<SessionId>,

    // -- Presence & realtime transport --
    /// Current presence status.
    pub presence_status: PresenceStatus,
    /// Whether a realtime connection is active.
    pub ws_connected: bool,
    /// When the realtime connection was established.
    pub ws_connected_at: Option<DateTime<Utc>>,

    // -- Termination --
    /// Who terminated this session (None for expiry and idle timeout).
    pub terminated_by: Option<UserId>,
    /// Reason for termination.
    pub terminated_reason: Option<String>,
    /// When the session was terminated.
    pub terminated_at: Option<DateTime<Utc>>,

    // -- Timestamps --
    /// When the session was created (login time).
    pub created_at: DateTime<Utc>,
    /// When the session expires (absolute timeout).
    pub expires_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Check whether the session is still active (not terminated and not expired).
    pub fn is_active(&self) -> bool {
        self.terminated_at.is_none() && self.expires_at > Utc::now()
    }

    /// Check whether the session has been terminated.
    pub fn is_terminated(&self) -> bool {
        self.terminated_at.is_some()
    }

    /// Check whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Check whether this session may be selected as an eviction victim.
    ///
    /// Admin-protected and already-terminating sessions are never eligible.
    pub fn is_evictable(&self) -> bool {
        self.is_active() && self.priority == SessionPriority::General
    }

    /// Calculate how long the session has been idle (in seconds).
    pub fn idle_seconds(&self) -> i64 {
        (Utc::now() - self.last_activity).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn live_session() -> Session {
        let now = Utc::now();
        Session {
            id: SessionId::new(),
            user_id: UserId::new(),
            token_hash: "h".to_string(),
            refresh_token_hash: None,
            ip_address: "127.0.0.1".parse().expect("ip"),
            user_agent: None,
            device_info: None,
            priority: SessionPriority::General,
            checkout_id: Some(CheckoutId::new()),
            seat_allocated_at: Some(now),
            overflow_kicked: None,
            presence_status: PresenceStatus::Active,
            ws_connected: false,
            ws_connected_at: None,
            terminated_by: None,
            terminated_reason: None,
            terminated_at: None,
            created_at: now,
            expires_at: now + Duration::hours(12),
            last_activity: now,
        }
    }

    #[test]
    fn test_live_session_is_active_and_evictable() {
        let session = live_session();
        assert!(session.is_active());
        assert!(session.is_evictable());
    }

    #[test]
    fn test_terminated_session_is_not_evictable() {
        let mut session = live_session();
        session.terminated_at = Some(Utc::now());
        assert!(!session.is_active());
        assert!(!session.is_evictable());
    }

    #[test]
    fn test_admin_session_is_not_evictable() {
        let mut session = live_session();
        session.priority = SessionPriority::Admin;
        assert!(session.is_active());
        assert!(!session.is_evictable());
    }

    #[test]
    fn test_expired_session_is_not_active() {
        let mut session = live_session();
        session.expires_at = Utc::now() - Duration::minutes(1);
        assert!(!session.is_active());
        assert!(session.is_expired());
    }
}
