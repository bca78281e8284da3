//! Seat pool management: ledger, limits, eviction, reconciliation.

pub mod eviction;
pub mod ledger;
pub mod limiter;
pub mod memory;
pub mod reconciler;
pub mod recovery;

pub use eviction::{EvictionState, OverflowEviction};
pub use ledger::{AllocationOutcome, LedgerState, ReleaseOutcome, SeatHold, SeatLedger};
pub use limiter::{LimitDecision, SessionLimiter};
pub use memory::MemorySeatLedger;
pub use reconciler::DriftReconciler;
