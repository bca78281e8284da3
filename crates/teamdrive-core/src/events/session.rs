//! Session-related domain events.

use serde::{Deserialize, Serialize};

use crate::types::id::{SessionId, UserId};

/// Events related to user sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A user was admitted and a session was created.
    Created {
        /// The session ID.
        session_id: SessionId,
        /// The user ID.
        user_id: UserId,
        /// The IP address of the login.
        ip_address: String,
    },
    /// A session was terminated (logout, expiry, admin action, or eviction).
    Terminated {
        /// The session ID.
        session_id: SessionId,
        /// The user whose session ended.
        user_id: UserId,
        /// Who terminated it (`None` for expiry and idle timeout).
        terminated_by: Option<UserId>,
        /// Why the session ended.
        reason: String,
    },
    /// A seat request was denied.
    SeatDenied {
        /// The user whose request was denied.
        user_id: UserId,
        /// Why the seat was denied.
        reason: String,
    },
}
