//! Seat checkout entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use teamdrive_core::types::id::{CheckoutId, SessionId, UserId};

/// A record of one seat being held, from allocation to release.
///
/// Created atomically with session creation and checked in exactly once
/// (logout, expiry, or eviction). Rows are never deleted; inactive
/// checkouts are the audit trail of seat consumption.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SeatCheckout {
    /// Unique checkout identifier.
    pub id: CheckoutId,
    /// Session that holds this checkout. Nullable: a checkout may briefly
    /// outlive its session during teardown, or be detached when the
    /// session row's reference is cleared.
    pub session_id: Option<SessionId>,
    /// User who holds the seat.
    pub user_id: UserId,
    /// Licensed feature name being consumed.
    pub feature_name: String,
    /// Opaque token issued by the external license authority.
    pub external_token: String,
    /// When the seat was checked out.
    pub checked_out_at: DateTime<Utc>,
    /// When the seat was checked in (None = still active).
    pub checked_in_at: Option<DateTime<Utc>>,
    /// IP address from which the checkout was made.
    pub ip_address: Option<std::net::IpAddr>,
    /// Whether this checkout is still active.
    pub is_active: bool,
}

impl SeatCheckout {
    /// Check if this checkout is currently active.
    pub fn is_currently_active(&self) -> bool {
        self.is_active && self.checked_in_at.is_none()
    }

    /// An active checkout whose session reference has been cleared.
    ///
    /// This is a terminal state requiring operator attention; the drift
    /// reconciler counts and reports orphans rather than silently checking
    /// them in.
    pub fn is_orphaned(&self) -> bool {
        self.is_currently_active() && self.session_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_checkout() -> SeatCheckout {
        SeatCheckout {
            id: CheckoutId::new(),
            session_id: Some(SessionId::new()),
            user_id: UserId::new(),
            feature_name: "meridian_teamdrive".to_string(),
            external_token: "tok-1".to_string(),
            checked_out_at: Utc::now(),
            checked_in_at: None,
            ip_address: None,
            is_active: true,
        }
    }

    #[test]
    fn test_active_checkout() {
        let checkout = active_checkout();
        assert!(checkout.is_currently_active());
        assert!(!checkout.is_orphaned());
    }

    #[test]
    fn test_orphaned_checkout() {
        let mut checkout = active_checkout();
        checkout.session_id = None;
        assert!(checkout.is_orphaned());
    }

    #[test]
    fn test_checked_in_checkout_is_inactive() {
        let mut checkout = active_checkout();
        checkout.is_active = false;
        checkout.checked_in_at = Some(Utc::now());
        assert!(!checkout.is_currently_active());
        assert!(!checkout.is_orphaned());
    }
}
