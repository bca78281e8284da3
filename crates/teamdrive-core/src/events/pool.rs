//! Seat pool domain events.

use serde::{Deserialize, Serialize};

use crate::types::id::SnapshotId;

/// Events related to the seat pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PoolEvent {
    /// The local ledger diverged from the external authority's report.
    DriftDetected {
        /// Signed difference: external checked-out minus local checked-out.
        delta: i64,
        /// Where the external reading came from.
        source: String,
    },
    /// A pool snapshot was recorded.
    SnapshotRecorded {
        /// The snapshot ID.
        snapshot_id: SnapshotId,
        /// Whether the snapshot carries a drift flag.
        drift_detected: bool,
    },
}
