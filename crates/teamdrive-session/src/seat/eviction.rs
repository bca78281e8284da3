//! Overflow eviction policy — victim selection for preempting requests.
//!
//! Invoked only when the ledger reports the pool exhausted and the
//! requester's priority allows preemption. Victim selection is
//! deterministic: oldest `last_activity` first, ties broken by oldest
//! `created_at`.

use teamdrive_core::types::id::SessionId;
use teamdrive_entity::session::model::Session;

/// Phases of one eviction-then-retry attempt.
///
/// The flow is driven iteratively through these states rather than
/// recursively, so a victim's own termination can never trigger a second
/// eviction within the same allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionState {
    /// Allocation was requested and the pool reported exhausted.
    Requested,
    /// A victim was selected and is being terminated.
    Evicting {
        /// The session being terminated.
        victim: SessionId,
    },
    /// The single post-eviction retry completed.
    Resolved {
        /// Whether the retry obtained a seat.
        granted: bool,
    },
}

/// Stateless victim selection for overflow eviction.
#[derive(Debug, Clone, Copy)]
pub struct OverflowEviction;

impl OverflowEviction {
    /// Select the eviction victim among candidate sessions.
    ///
    /// Only sessions that are evictable (live, general priority) are
    /// considered; among them the one with the oldest `last_activity`
    /// wins, with `created_at` as the deterministic tie-break.
    pub fn select_victim(candidates: &[Session]) -> Option<&Session> {
        candidates
            .iter()
            .filter(|s| s.is_evictable())
            .min_by_key(|s| (s.last_activity, s.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use teamdrive_core::types::id::{CheckoutId, UserId};
    use teamdrive_entity::presence::PresenceStatus;
    use teamdrive_entity::session::priority::SessionPriority;

    fn session(last_activity_mins_ago: i64, created_mins_ago: i64) -> Session {
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
            created_at: now - Duration::minutes(created_mins_ago),
            expires_at: now + Duration::hours(12),
            last_activity: now - Duration::minutes(last_activity_mins_ago),
        }
    }

    #[test]
    fn test_oldest_activity_wins() {
        let a = session(60, 10);
        let b = session(5, 120);
        let candidates = vec![b.clone(), a.clone()];

        let victim = OverflowEviction::select_victim(&candidates).expect("victim");
        assert_eq!(victim.id, a.id);
    }

    #[test]
    fn test_tie_broken_by_created_at() {
        let now = Utc::now();
        let mut a = session(30, 120);
        let mut b = session(30, 10);
        a.last_activity = now - Duration::minutes(30);
        b.last_activity = a.last_activity;

        let candidates = vec![b.clone(), a.clone()];
        let victim = OverflowEviction::select_victim(&candidates).expect("victim");
        assert_eq!(victim.id, a.id);
    }

    #[test]
    fn test_admin_sessions_are_protected() {
        let mut admin = session(120, 120);
        admin.priority = SessionPriority::Admin;
        let general = session(5, 5);

        let candidates = vec![admin.clone(), general.clone()];
        let victim = OverflowEviction::select_victim(&candidates).expect("victim");
        assert_eq!(victim.id, general.id);
    }

    #[test]
    fn test_terminating_sessions_are_skipped() {
        let mut terminating = session(120, 120);
        terminating.terminated_at = Some(Utc::now());
        let live = session(5, 5);

        let candidates = vec![terminating, live.clone()];
        let victim = OverflowEviction::select_victim(&candidates).expect("victim");
        assert_eq!(victim.id, live.id);
    }

    #[test]
    fn test_no_eligible_victim() {
        let mut admin = session(120, 120);
        admin.priority = SessionPriority::Admin;

        assert!(OverflowEviction::select_victim(&[admin]).is_none());
        assert!(OverflowEviction::select_victim(&[]).is_none());
    }
}
