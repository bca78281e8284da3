//! Session management configuration.

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle timeout in minutes before a session is considered inactive.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_minutes: u64,
    /// Absolute session timeout in hours (regardless of activity).
    #[serde(default = "default_absolute_timeout")]
    pub absolute_timeout_hours: u64,
    /// Interval for expired session cleanup in minutes.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
    /// Concurrent session limits configuration.
    #[serde(default)]
    pub limits: SessionLimitsConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: default_idle_timeout(),
            absolute_timeout_hours: default_absolute_timeout(),
            cleanup_interval_minutes: default_cleanup_interval(),
            limits: SessionLimitsConfig::default(),
        }
    }
}

/// Concurrent session limits configuration.
///
/// A per-user override row takes priority over `default_max_sessions`.
/// A value of `0` means unlimited (bounded only by the seat pool).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLimitsConfig {
    /// Whether concurrent session limits are enforced.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Default maximum concurrent sessions per user.
    #[serde(default = "default_max_sessions")]
    pub default_max_sessions: u32,
}

impl Default for SessionLimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_max_sessions: default_max_sessions(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_absolute_timeout() -> u64 {
    12
}

fn default_cleanup_interval() -> u64 {
    15
}

fn default_max_sessions() -> u32 {
    0
}

fn default_true() -> bool {
    true
}
