//! Persistence seams for the admission core.
//!
//! The controller, reconciler, and sweeper operate on these traits so the
//! same logic runs against PostgreSQL in production and the in-memory
//! stores in tests and single-node development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{CheckoutId, SessionId, UserId};
use teamdrive_entity::presence::PresenceStatus;
use teamdrive_entity::seat::checkout::SeatCheckout;
use teamdrive_entity::seat::pool::PoolSnapshot;
use teamdrive_entity::session::limit::UserSessionLimit;
use teamdrive_entity::session::model::Session;

pub use memory::{
    MemoryCheckoutStore, MemorySessionLimitStore, MemorySessionStore, MemorySnapshotStore,
};
pub use postgres::{PgCheckoutStore, PgSessionLimitStore, PgSessionStore, PgSnapshotStore};

/// Session persistence operations.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Insert a fully constructed session.
    async fn insert(&self, session: &Session) -> AppResult<()>;

    /// Find a session by ID.
    async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>>;

    /// List active (non-terminated, non-expired) sessions for a user.
    async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Session>>;

    /// Count active sessions for a user.
    async fn count_active_by_user(&self, user_id: UserId) -> AppResult<i64>;

    /// Count all active sessions system-wide.
    async fn count_all_active(&self) -> AppResult<i64>;

    /// List all active sessions.
    async fn find_all_active(&self) -> AppResult<Vec<Session>>;

    /// List live sessions eligible for overflow eviction.
    async fn find_evictable(&self) -> AppResult<Vec<Session>>;

    /// Bump the last-activity timestamp.
    async fn touch_activity(&self, id: SessionId, at: DateTime<Utc>) -> AppResult<()>;

    /// Update presence status.
    async fn set_presence(&self, id: SessionId, status: PresenceStatus) -> AppResult<()>;

    /// Update the realtime connection flag.
    async fn set_ws_connected(
        &self,
        id: SessionId,
        connected: bool,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    /// Attach the seat checkout reference.
    async fn set_checkout(
        &self,
        id: SessionId,
        checkout_id: CheckoutId,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Mark a session terminated. Returns `false` if it already was —
    /// duplicate termination triggers are expected and benign.
    async fn terminate(
        &self,
        id: SessionId,
        terminated_by: Option<UserId>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Sessions past their absolute expiry or idle cutoff, for the sweeper.
    async fn find_expired_or_idle(
        &self,
        now: DateTime<Utc>,
        idle_cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Session>>;
}

/// Seat checkout audit-record operations.
#[async_trait]
pub trait CheckoutStore: Send + Sync + std::fmt::Debug {
    /// Insert a checkout record.
    async fn insert(&self, checkout: &SeatCheckout) -> AppResult<()>;

    /// Find a checkout by ID.
    async fn find_by_id(&self, id: CheckoutId) -> AppResult<Option<SeatCheckout>>;

    /// List all active checkouts.
    async fn find_all_active(&self) -> AppResult<Vec<SeatCheckout>>;

    /// List active checkouts for a session.
    async fn find_active_by_session(&self, session_id: SessionId) -> AppResult<Vec<SeatCheckout>>;

    /// Count all active checkouts.
    async fn count_active(&self) -> AppResult<i64>;

    /// Count active checkouts with no session reference.
    async fn count_orphaned(&self) -> AppResult<i64>;

    /// Check a seat in. Returns `false` if it already was.
    async fn checkin(&self, id: CheckoutId, at: DateTime<Utc>) -> AppResult<bool>;
}

/// Per-user session limit override operations.
#[async_trait]
pub trait SessionLimitStore: Send + Sync + std::fmt::Debug {
    /// Find the override for a user, if any.
    async fn find_by_user(&self, user_id: UserId) -> AppResult<Option<UserSessionLimit>>;

    /// Create or update an override.
    async fn upsert(
        &self,
        user_id: UserId,
        max_sessions: i32,
        reason: Option<&str>,
        set_by: UserId,
    ) -> AppResult<()>;

    /// Remove an override (falls back to the configured default).
    async fn remove(&self, user_id: UserId) -> AppResult<()>;
}

/// Pool snapshot time-series operations.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Insert a snapshot.
    async fn insert(&self, snapshot: &PoolSnapshot) -> AppResult<()>;

    /// The most recent snapshot, if any.
    async fn latest(&self) -> AppResult<Option<PoolSnapshot>>;

    /// Delete snapshots older than the cutoff. Returns rows removed.
    async fn cleanup_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}
