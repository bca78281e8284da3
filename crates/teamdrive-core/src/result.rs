//! Application result alias.

use crate::error::AppError;

/// Convenience alias used by all TeamDrive crates.
pub type AppResult<T> = Result<T, AppError>;
