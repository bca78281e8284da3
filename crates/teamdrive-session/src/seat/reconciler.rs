//! Drift reconciliation and snapshot recording.
//!
//! Runs on a fixed interval, never request-triggered. Compares the local
//! ledger against the external authority's report, records a pool snapshot
//! on every cycle (drift or not), and raises an observability signal on
//! divergence. Drift never mutates the ledger: a stale external read must
//! not cause oscillation, so remediation is left to the operator.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use teamdrive_core::events::{DomainEvent, EventBus, PoolEvent};
use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::SnapshotId;
use teamdrive_entity::seat::pool::PoolSnapshot;
use teamdrive_license::authority::LicenseAuthority;

use crate::store::{CheckoutStore, SessionStore, SnapshotStore};

use super::ledger::SeatLedger;

/// Reconciles the seat ledger against the external authority and records
/// the snapshot time series.
#[derive(Clone)]
pub struct DriftReconciler {
    /// Seat ledger to read (never mutate).
    ledger: Arc<dyn SeatLedger>,
    /// External authority for the comparison reading.
    authority: Arc<dyn LicenseAuthority>,
    /// Session store for the active session count.
    session_store: Arc<dyn SessionStore>,
    /// Checkout store for orphan detection.
    checkout_store: Arc<dyn CheckoutStore>,
    /// Snapshot persistence.
    snapshot_store: Arc<dyn SnapshotStore>,
    /// Event bus for drift signals.
    events: EventBus,
    /// Licensed feature to reconcile.
    feature_name: String,
}

impl std::fmt::Debug for DriftReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftReconciler")
            .field("feature_name", &self.feature_name)
            .finish()
    }
}

impl DriftReconciler {
    /// Create a new drift reconciler.
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        authority: Arc<dyn LicenseAuthority>,
        session_store: Arc<dyn SessionStore>,
        checkout_store: Arc<dyn CheckoutStore>,
        snapshot_store: Arc<dyn SnapshotStore>,
        events: EventBus,
        feature_name: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            authority,
            session_store,
            checkout_store,
            snapshot_store,
            events,
            feature_name: feature_name.into(),
        }
    }

    /// Perform one reconciliation cycle and persist a snapshot tagged with
    /// `source`. Returns whether drift was detected.
    pub async fn run_cycle(&self, source: &str) -> AppResult<bool> {
        let local = self.ledger.current_state().await?;
        let active_sessions = self.session_store.count_all_active().await?;
        let orphaned = self.checkout_store.count_orphaned().await?;

        if orphaned > 0 {
            // Orphaned active checkouts are a terminal state requiring
            // operator attention; they are reported, never auto-released.
            warn!(
                orphaned = orphaned,
                "Active checkouts with no session reference detected"
            );
        }

        let mut drift_detected = false;
        let mut delta: i64 = 0;
        let drift_detail = match self.authority.report_state(&self.feature_name).await {
            Ok(external) => {
                delta = external.checked_out as i64 - local.checked_out as i64;
                drift_detected = delta != 0;

                if drift_detected || orphaned > 0 {
                    Some(serde_json::json!({
                        "local_checked_out": local.checked_out,
                        "external_checked_out": external.checked_out,
                        "delta": delta,
                        "external_source": external.source,
                        "orphaned_checkouts": orphaned,
                    }))
                } else {
                    None
                }
            }
            Err(e) => {
                warn!(error = %e, "Authority unreachable during reconciliation");
                Some(serde_json::json!({
                    "local_checked_out": local.checked_out,
                    "authority_error": e.to_string(),
                    "orphaned_checkouts": orphaned,
                }))
            }
        };

        if drift_detected {
            warn!(
                local_checked_out = local.checked_out,
                delta = delta,
                "Pool drift detected"
            );
            self.events.publish(DomainEvent::Pool(PoolEvent::DriftDetected {
                delta,
                source: source.to_string(),
            }));
        }

        let snapshot = PoolSnapshot {
            id: SnapshotId::new(),
            total_seats: local.total_seats as i32,
            checked_out: local.checked_out as i32,
            available: local.available as i32,
            admin_reserved: local.admin_reserved as i32,
            active_sessions: active_sessions as i32,
            drift_detected,
            drift_detail,
            source: source.to_string(),
            created_at: Utc::now(),
        };

        self.snapshot_store.insert(&snapshot).await?;
        self.events
            .publish(DomainEvent::Pool(PoolEvent::SnapshotRecorded {
                snapshot_id: snapshot.id,
                drift_detected,
            }));

        Ok(drift_detected)
    }

    /// Record the startup snapshot.
    pub async fn startup_snapshot(&self) -> AppResult<()> {
        info!("Recording startup pool snapshot");
        self.run_cycle("startup").await?;
        Ok(())
    }

    /// Record the shutdown snapshot (the flush performed at teardown).
    pub async fn shutdown_snapshot(&self) -> AppResult<()> {
        info!("Recording shutdown pool snapshot");
        self.run_cycle("shutdown").await?;
        Ok(())
    }

    /// Run the periodic reconciliation loop until cancelled.
    pub async fn run(
        &self,
        interval: Duration,
        retention: chrono::Duration,
        cancel: watch::Receiver<bool>,
    ) {
        info!(
            interval_secs = interval.as_secs(),
            "Drift reconciler started"
        );

        let mut ticker = tokio::time::interval(interval);
        let mut cancel = cancel;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle("reconciler").await {
                        error!(error = %e, "Reconciliation cycle failed");
                    }

                    let cutoff = Utc::now() - retention;
                    match self.snapshot_store.cleanup_before(cutoff).await {
                        Ok(removed) if removed > 0 => {
                            info!(removed = removed, "Pruned old pool snapshots");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "Snapshot pruning failed"),
                    }
                }
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Drift reconciler shutting down");
                        break;
                    }
                }
            }
        }
    }
}
