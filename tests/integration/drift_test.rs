//! Integration tests for drift reconciliation and snapshot recording.

mod helpers;

use helpers::{FEATURE, TestHarness};
use teamdrive_core::types::id::UserId;
use teamdrive_entity::session::priority::SessionPriority;
use teamdrive_session::store::CheckoutStore;

#[tokio::test]
async fn test_clean_cycle_records_snapshot_without_drift() {
    let harness = TestHarness::new(10, 0);

    for _ in 0..2 {
        harness
            .controller
            .admit(harness.request(UserId::new(), SessionPriority::General))
            .await
            .expect("admit");
    }

    let drift = harness
        .reconciler
        .run_cycle("reconciler")
        .await
        .expect("cycle");
    assert!(!drift);

    let snapshots = harness.snapshot_store.all();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    assert_eq!(snapshot.checked_out, 2);
    assert_eq!(snapshot.active_sessions, 2);
    assert_eq!(snapshot.available, 8);
    assert!(!snapshot.drift_detected);
    assert!(snapshot.drift_detail.is_none());
}

#[tokio::test]
async fn test_drift_is_recorded_but_never_auto_corrected() {
    let harness = TestHarness::new(10, 0);

    for _ in 0..5 {
        harness
            .controller
            .admit(harness.request(UserId::new(), SessionPriority::General))
            .await
            .expect("admit");
    }

    // The authority sees two extra checkouts the ledger knows nothing
    // about: external 7 vs local 5.
    harness.authority.inject_external_checkouts(FEATURE, 2);

    let drift = harness
        .reconciler
        .run_cycle("reconciler")
        .await
        .expect("cycle");
    assert!(drift);

    let snapshots = harness.snapshot_store.all();
    let snapshot = snapshots.last().expect("snapshot");
    assert!(snapshot.drift_detected);
    let detail = snapshot.drift_detail.as_ref().expect("detail");
    assert_eq!(detail["local_checked_out"], 5);
    assert_eq!(detail["external_checked_out"], 7);
    assert_eq!(detail["delta"], 2);

    // No auto-correction of the local ledger.
    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 5);
}

#[tokio::test]
async fn test_fail_open_checkin_is_caught_by_next_reconciliation() {
    let harness = TestHarness::new(5, 0);
    let user = UserId::new();

    let admitted = harness
        .controller
        .admit(harness.request(user, SessionPriority::General))
        .await
        .expect("admit");

    // The authority goes dark; logout must still free the seat locally.
    harness.authority.set_unreachable(true);
    harness
        .controller
        .logout(admitted.session.id, user)
        .await
        .expect("logout proceeds despite unreachable authority");

    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 0);
    let checkout = harness
        .checkout_store
        .find_by_id(admitted.checkout.expect("checkout").id)
        .await
        .expect("query")
        .expect("exists");
    assert!(!checkout.is_active);
    assert!(checkout.checked_in_at.is_some());

    // The authority still counts the leaked token; the next cycle
    // surfaces it as drift instead of silently diverging.
    harness.authority.set_unreachable(false);
    assert_eq!(harness.authority.issued_count(FEATURE), 1);

    let drift = harness
        .reconciler
        .run_cycle("reconciler")
        .await
        .expect("cycle");
    assert!(drift);
    let snapshots = harness.snapshot_store.all();
    let detail = snapshots
        .last()
        .expect("snapshot")
        .drift_detail
        .as_ref()
        .expect("detail");
    assert_eq!(detail["delta"], 1);
}

#[tokio::test]
async fn test_unreachable_authority_cycle_still_persists_snapshot() {
    let harness = TestHarness::new(5, 0);
    harness.authority.set_unreachable(true);

    let drift = harness
        .reconciler
        .run_cycle("reconciler")
        .await
        .expect("cycle");
    assert!(!drift);

    let snapshots = harness.snapshot_store.all();
    assert_eq!(snapshots.len(), 1);
    let detail = snapshots[0].drift_detail.as_ref().expect("detail");
    assert!(detail["authority_error"].as_str().is_some());
}
