//! Repository implementations for the seat admission core.

pub mod checkout;
pub mod pool_snapshot;
pub mod session;
pub mod session_limit;

pub use checkout::SeatCheckoutRepository;
pub use pool_snapshot::PoolSnapshotRepository;
pub use session::SessionRepository;
pub use session_limit::SessionLimitRepository;
