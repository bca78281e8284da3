//! Pool snapshot entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use teamdrive_core::types::id::SnapshotId;

/// A point-in-time audit record of seat accounting.
///
/// Snapshots are written only by the drift reconciler (and the startup and
/// shutdown brackets), on every cycle, drift or not. They are the only
/// durable time series for audit and capacity planning and are never
/// mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PoolSnapshot {
    /// Snapshot ID.
    pub id: SnapshotId,
    /// Total seats at snapshot time.
    pub total_seats: i32,
    /// Checked-out seats according to the local ledger.
    pub checked_out: i32,
    /// Available seats.
    pub available: i32,
    /// Admin-reserved seats.
    pub admin_reserved: i32,
    /// Active sessions counted from the session store.
    pub active_sessions: i32,
    /// Whether the external authority's report diverged from the ledger.
    pub drift_detected: bool,
    /// Structured drift detail (JSON): local and external counts, signed
    /// delta, external source, orphaned checkout count.
    pub drift_detail: Option<serde_json::Value>,
    /// Which code path recorded the snapshot
    /// (`"reconciler"`, `"startup"`, `"shutdown"`).
    pub source: String,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}
