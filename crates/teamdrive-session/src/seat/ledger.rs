//! Seat ledger trait and shared types.
//!
//! The ledger is the single point of truth for seat-count arithmetic.
//! Every check-and-increment executes inside one serialization domain, so
//! two concurrent allocation requests can never both observe the last
//! free seat.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{CheckoutId, UserId};

/// One seat held in the ledger, keyed by its checkout identifier.
///
/// The hold is the in-memory half of a checkout: the persisted
/// `SeatCheckout` row materializes once the external authority confirms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatHold {
    /// Checkout identifier, shared with the persisted record.
    pub checkout_id: CheckoutId,
    /// User holding the seat.
    pub user_id: UserId,
    /// Licensed feature being consumed.
    pub feature_name: String,
    /// When the ledger granted the seat.
    pub allocated_at: DateTime<Utc>,
}

/// Result of attempting to allocate a seat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AllocationOutcome {
    /// A seat was granted and is now counted as checked out.
    Granted(SeatHold),
    /// The pool has no seat available for this request.
    SeatUnavailable,
}

/// Result of releasing a seat.
///
/// Releasing an already-released checkout is a benign outcome, not an
/// error: duplicate termination triggers (expiry timer racing an explicit
/// logout) are expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseOutcome {
    /// The seat was returned to the pool.
    Released,
    /// The checkout was not held; nothing changed.
    AlreadyReleased,
}

/// Current state of the seat pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    /// Total seats in the pool.
    pub total_seats: u32,
    /// Seats withheld from general allocation.
    pub admin_reserved: u32,
    /// Seats currently checked out.
    pub checked_out: u32,
    /// Seats available for allocation
    /// (`total_seats - admin_reserved - checked_out`).
    pub available: u32,
}

/// Trait for atomic seat allocation and release.
///
/// Implementations must be thread-safe. The critical section is held only
/// for arithmetic, never across an external authority call.
#[async_trait]
pub trait SeatLedger: Send + Sync + std::fmt::Debug {
    /// Attempt to atomically allocate a seat for the given user.
    async fn try_allocate(
        &self,
        user_id: UserId,
        feature_name: &str,
    ) -> AppResult<AllocationOutcome>;

    /// Release a previously allocated seat. Idempotent.
    async fn release(&self, checkout_id: CheckoutId) -> AppResult<ReleaseOutcome>;

    /// Return the current pool state.
    async fn current_state(&self) -> AppResult<LedgerState>;

    /// Set the total seat count (e.g., after a fresh authority report).
    async fn set_total_seats(&self, total: u32) -> AppResult<()>;

    /// Set the number of admin-reserved seats.
    async fn set_admin_reserved(&self, reserved: u32) -> AppResult<()>;

    /// Rebuild holds from persisted active checkouts at startup.
    async fn restore(&self, holds: Vec<SeatHold>) -> AppResult<()>;
}
