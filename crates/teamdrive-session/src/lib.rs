//! # teamdrive-session
//!
//! The seat pool and session admission core for Meridian TeamDrive:
//! seat ledger, per-user session limits, overflow eviction, session
//! lifecycle, and drift reconciliation against the external license
//! authority.
//!
//! ## Modules
//!
//! - `seat` — seat ledger, session limiter, eviction policy, drift
//!   reconciler, startup recovery
//! - `session` — session lifecycle controller and expiry sweeper
//! - `store` — persistence seams (traits, Postgres-backed and in-memory
//!   implementations)

pub mod seat;
pub mod session;
pub mod store;

pub use seat::{
    AllocationOutcome, DriftReconciler, LedgerState, MemorySeatLedger, OverflowEviction,
    ReleaseOutcome, SeatHold, SeatLedger, SessionLimiter,
};
pub use session::{AdmissionRequest, AdmittedSession, SessionCleanup, SessionController};
pub use store::{CheckoutStore, SessionLimitStore, SessionStore, SnapshotStore};
