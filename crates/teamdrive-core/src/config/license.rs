//! License authority integration configuration.

use serde::{Deserialize, Serialize};

/// License authority configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// License authority provider (`"http"` or `"mock"`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL of the external license authority.
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    /// Licensed feature name consumed by each seat checkout.
    #[serde(default = "default_feature_name")]
    pub feature_name: String,
    /// Per-request timeout for authority calls in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Retry policy for unreachable-authority failures.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Seat pool management configuration.
    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            authority_url: default_authority_url(),
            feature_name: default_feature_name(),
            request_timeout_ms: default_request_timeout(),
            retry: RetryConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

/// Bounded exponential backoff policy for authority calls.
///
/// Only `Unreachable` outcomes are retried; a denial from the authority
/// is final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay before the first retry in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

/// Seat pool management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Total seats to assume when the authority cannot report at startup.
    #[serde(default = "default_total_seats")]
    pub total_seats: u32,
    /// Number of seats withheld from general allocation.
    #[serde(default = "default_admin_reserved")]
    pub admin_reserved: u32,
    /// How often the drift reconciler runs, in seconds.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_seconds: u64,
    /// How long pool snapshots are retained, in days.
    #[serde(default = "default_snapshot_retention")]
    pub snapshot_retention_days: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            total_seats: default_total_seats(),
            admin_reserved: default_admin_reserved(),
            reconcile_interval_seconds: default_reconcile_interval(),
            snapshot_retention_days: default_snapshot_retention(),
        }
    }
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_authority_url() -> String {
    "http://localhost:27000".to_string()
}

fn default_feature_name() -> String {
    "meridian_teamdrive".to_string()
}

fn default_request_timeout() -> u64 {
    3000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    100
}

fn default_max_delay() -> u64 {
    2000
}

fn default_total_seats() -> u32 {
    10
}

fn default_admin_reserved() -> u32 {
    1
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_snapshot_retention() -> u32 {
    90
}
