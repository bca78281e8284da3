//! # teamdrive-entity
//!
//! Persisted domain models for the TeamDrive seat admission core:
//! sessions, seat checkouts, per-user session limit overrides, pool
//! snapshots, and presence status.

pub mod presence;
pub mod seat;
pub mod session;

pub use presence::PresenceStatus;
pub use seat::{PoolSnapshot, SeatCheckout};
pub use session::{Session, SessionPriority, UserSessionLimit};
