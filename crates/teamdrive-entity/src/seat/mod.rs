//! Seat checkout and pool snapshot entities.

pub mod checkout;
pub mod pool;

pub use checkout::SeatCheckout;
pub use pool::PoolSnapshot;
