//! In-memory store implementations for single-node development and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use teamdrive_core::error::AppError;
use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{CheckoutId, SessionId, UserId};
use teamdrive_entity::presence::PresenceStatus;
use teamdrive_entity::seat::checkout::SeatCheckout;
use teamdrive_entity::seat::pool::PoolSnapshot;
use teamdrive_entity::session::limit::UserSessionLimit;
use teamdrive_entity::session::model::Session;
use teamdrive_entity::session::priority::SessionPriority;

use super::{CheckoutStore, SessionLimitStore, SessionStore, SnapshotStore};

fn is_live(session: &Session, now: DateTime<Utc>) -> bool {
    session.terminated_at.is_none() && session.expires_at > now
}

/// [`SessionStore`] backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && is_live(&s, now))
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn count_active_by_user(&self, user_id: UserId) -> AppResult<i64> {
        let now = Utc::now();
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && is_live(&s, now))
            .count() as i64)
    }

    async fn count_all_active(&self) -> AppResult<i64> {
        let now = Utc::now();
        Ok(self
            .sessions
            .iter()
            .filter(|s| is_live(&s, now))
            .count() as i64)
    }

    async fn find_all_active(&self) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| is_live(&s, now))
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn find_evictable(&self) -> AppResult<Vec<Session>> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| is_live(&s, now) && s.priority == SessionPriority::General)
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| {
            a.last_activity
                .cmp(&b.last_activity)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(sessions)
    }

    async fn touch_activity(&self, id: SessionId, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.last_activity = at;
        }
        Ok(())
    }

    async fn set_presence(&self, id: SessionId, status: PresenceStatus) -> AppResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.presence_status = status;
        }
        Ok(())
    }

    async fn set_ws_connected(
        &self,
        id: SessionId,
        connected: bool,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.ws_connected = connected;
            if connected {
                session.ws_connected_at = at;
            }
        }
        Ok(())
    }

    async fn set_checkout(
        &self,
        id: SessionId,
        checkout_id: CheckoutId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))?;
        session.checkout_id = Some(checkout_id);
        session.seat_allocated_at = Some(at);
        Ok(())
    }

    async fn terminate(
        &self,
        id: SessionId,
        terminated_by: Option<UserId>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut session) = self.sessions.get_mut(&id) else {
            return Ok(false);
        };
        if session.terminated_at.is_some() {
            return Ok(false);
        }
        session.terminated_by = terminated_by;
        session.terminated_reason = Some(reason.to_string());
        session.terminated_at = Some(at);
        Ok(true)
    }

    async fn find_expired_or_idle(
        &self,
        now: DateTime<Utc>,
        idle_cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| {
                s.terminated_at.is_none() && (s.expires_at <= now || s.last_activity < idle_cutoff)
            })
            .map(|s| s.clone())
            .collect())
    }
}

/// [`CheckoutStore`] backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryCheckoutStore {
    checkouts: DashMap<CheckoutId, SeatCheckout>,
}

impl MemoryCheckoutStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckoutStore for MemoryCheckoutStore {
    async fn insert(&self, checkout: &SeatCheckout) -> AppResult<()> {
        self.checkouts.insert(checkout.id, checkout.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CheckoutId) -> AppResult<Option<SeatCheckout>> {
        Ok(self.checkouts.get(&id).map(|c| c.clone()))
    }

    async fn find_all_active(&self) -> AppResult<Vec<SeatCheckout>> {
        Ok(self
            .checkouts
            .iter()
            .filter(|c| c.is_active)
            .map(|c| c.clone())
            .collect())
    }

    async fn find_active_by_session(&self, session_id: SessionId) -> AppResult<Vec<SeatCheckout>> {
        Ok(self
            .checkouts
            .iter()
            .filter(|c| c.is_active && c.session_id == Some(session_id))
            .map(|c| c.clone())
            .collect())
    }

    async fn count_active(&self) -> AppResult<i64> {
        Ok(self.checkouts.iter().filter(|c| c.is_active).count() as i64)
    }

    async fn count_orphaned(&self) -> AppResult<i64> {
        Ok(self
            .checkouts
            .iter()
            .filter(|c| c.is_active && c.session_id.is_none())
            .count() as i64)
    }

    async fn checkin(&self, id: CheckoutId, at: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut checkout) = self.checkouts.get_mut(&id) else {
            return Ok(false);
        };
        if !checkout.is_active {
            return Ok(false);
        }
        checkout.is_active = false;
        checkout.checked_in_at = Some(at);
        Ok(true)
    }
}

/// [`SessionLimitStore`] backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemorySessionLimitStore {
    limits: DashMap<UserId, UserSessionLimit>,
}

impl MemorySessionLimitStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionLimitStore for MemorySessionLimitStore {
    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<UserSessionLimit>> {
        Ok(self.limits.get(&user_id).map(|l| l.clone()))
    }

    async fn upsert(
        &self,
        user_id: UserId,
        max_sessions: i32,
        reason: Option<&str>,
        set_by: UserId,
    ) -> AppResult<()> {
        let now = Utc::now();
        self.limits
            .entry(user_id)
            .and_modify(|limit| {
                limit.max_sessions = max_sessions;
                limit.reason = reason.map(String::from);
                limit.set_by = Some(set_by);
                limit.updated_at = now;
            })
            .or_insert_with(|| UserSessionLimit {
                user_id,
                max_sessions,
                reason: reason.map(String::from),
                set_by: Some(set_by),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn remove(&self, user_id: UserId) -> AppResult<()> {
        self.limits.remove(&user_id);
        Ok(())
    }
}

/// [`SnapshotStore`] backed by an append-only vector.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<Vec<PoolSnapshot>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded snapshots, oldest first.
    pub fn all(&self) -> Vec<PoolSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn insert(&self, snapshot: &PoolSnapshot) -> AppResult<()> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(snapshot.clone());
        Ok(())
    }

    async fn latest(&self) -> AppResult<Option<PoolSnapshot>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned())
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        let before = snapshots.len();
        snapshots.retain(|s| s.created_at >= cutoff);
        Ok((before - snapshots.len()) as u64)
    }
}
