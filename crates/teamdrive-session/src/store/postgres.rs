//! Postgres-backed store implementations wrapping the database repositories.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{CheckoutId, SessionId, UserId};
use teamdrive_database::repositories::checkout::SeatCheckoutRepository;
use teamdrive_database::repositories::pool_snapshot::PoolSnapshotRepository;
use teamdrive_database::repositories::session::SessionRepository;
use teamdrive_database::repositories::session_limit::SessionLimitRepository;
use teamdrive_entity::presence::PresenceStatus;
use teamdrive_entity::seat::checkout::SeatCheckout;
use teamdrive_entity::seat::pool::PoolSnapshot;
use teamdrive_entity::session::limit::UserSessionLimit;
use teamdrive_entity::session::model::Session;

use super::{CheckoutStore, SessionLimitStore, SessionStore, SnapshotStore};

/// [`SessionStore`] over the sessions table.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    repo: Arc<SessionRepository>,
}

impl PgSessionStore {
    /// Wrap a session repository.
    pub fn new(repo: Arc<SessionRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        self.repo.create(session).await
    }

    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>> {
        self.repo.find_by_id(id).await
    }

    async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Session>> {
        self.repo.find_active_by_user(user_id).await
    }

    async fn count_active_by_user(&self, user_id: UserId) -> AppResult<i64> {
        self.repo.count_active_by_user(user_id).await
    }

    async fn count_all_active(&self) -> AppResult<i64> {
        self.repo.count_all_active().await
    }

    async fn find_all_active(&self) -> AppResult<Vec<Session>> {
        self.repo.find_all_active().await
    }

    async fn find_evictable(&self) -> AppResult<Vec<Session>> {
        self.repo.find_evictable().await
    }

    async fn touch_activity(&self, id: SessionId, at: DateTime<Utc>) -> AppResult<()> {
        self.repo.update_last_activity(id, at).await
    }

    async fn set_presence(&self, id: SessionId, status: PresenceStatus) -> AppResult<()> {
        self.repo.set_presence_status(id, status).await
    }

    async fn set_ws_connected(
        &self,
        id: SessionId,
        connected: bool,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.repo.set_ws_connected(id, connected, at).await
    }

    async fn set_checkout(
        &self,
        id: SessionId,
        checkout_id: CheckoutId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.repo.set_checkout(id, checkout_id, at).await
    }

    async fn terminate(
        &self,
        id: SessionId,
        terminated_by: Option<UserId>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let rows = self.repo.terminate(id, terminated_by, reason, at).await?;
        Ok(rows > 0)
    }

    async fn find_expired_or_idle(
        &self,
        now: DateTime<Utc>,
        idle_cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        self.repo.find_expired_or_idle(now, idle_cutoff).await
    }
}

/// [`CheckoutStore`] over the seat_checkouts table.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    repo: Arc<SeatCheckoutRepository>,
}

impl PgCheckoutStore {
    /// Wrap a checkout repository.
    pub fn new(repo: Arc<SeatCheckoutRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn insert(&self, checkout: &SeatCheckout) -> AppResult<()> {
        self.repo.create(checkout).await
    }

    async fn find_by_id(&self, id: CheckoutId) -> AppResult<Option<SeatCheckout>> {
        self.repo.find_by_id(id).await
    }

    async fn find_all_active(&self) -> AppResult<Vec<SeatCheckout>> {
        self.repo.find_all_active().await
    }

    async fn find_active_by_session(&self, session_id: SessionId) -> AppResult<Vec<SeatCheckout>> {
        self.repo.find_active_by_session(session_id).await
    }

    async fn count_active(&self) -> AppResult<i64> {
        self.repo.count_active().await
    }

    async fn count_orphaned(&self) -> AppResult<i64> {
        self.repo.count_orphaned().await
    }

    async fn checkin(&self, id: CheckoutId, at: DateTime<Utc>) -> AppResult<bool> {
        let rows = self.repo.checkin(id, at).await?;
        Ok(rows > 0)
    }
}

/// [`SessionLimitStore`] over the user_session_limits table.
#[derive(Debug, Clone)]
pub struct PgSessionLimitStore {
    repo: Arc<SessionLimitRepository>,
}

impl PgSessionLimitStore {
    /// Wrap a session limit repository.
    pub fn new(repo: Arc<SessionLimitRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SessionLimitStore for PgSessionLimitStore {
    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<UserSessionLimit>> {
        self.repo.find_by_user_id(user_id).await
    }

    async fn upsert(
        &self,
        user_id: UserId,
        max_sessions: i32,
        reason: Option<&str>,
        set_by: UserId,
    ) -> AppResult<()> {
        self.repo.upsert(user_id, max_sessions, reason, set_by).await
    }

    async fn remove(&self, user_id: UserId) -> AppResult<()> {
        self.repo.delete(user_id).await
    }
}

/// [`SnapshotStore`] over the pool_snapshots table.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    repo: Arc<PoolSnapshotRepository>,
}

impl PgSnapshotStore {
    /// Wrap a pool snapshot repository.
    pub fn new(repo: Arc<PoolSnapshotRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn insert(&self, snapshot: &PoolSnapshot) -> AppResult<()> {
        self.repo.create(snapshot).await
    }

    async fn latest(&self) -> AppResult<Option<PoolSnapshot>> {
        self.repo.find_latest().await
    }

    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        self.repo.cleanup_old(cutoff).await
    }
}
