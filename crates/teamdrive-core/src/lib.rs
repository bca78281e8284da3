//! # teamdrive-core
//!
//! Core crate for Meridian TeamDrive. Contains configuration schemas,
//! typed identifiers, domain events, the in-process event bus, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other TeamDrive crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
