//! Integration tests for the session lifecycle: logout, expiry sweep,
//! heartbeats, and the seat/session invariants.

mod helpers;

use chrono::{Duration, Utc};

use helpers::TestHarness;
use teamdrive_core::types::id::UserId;
use teamdrive_entity::presence::PresenceStatus;
use teamdrive_entity::session::priority::SessionPriority;
use teamdrive_session::session::controller::{REASON_EXPIRED, REASON_IDLE, REASON_LOGOUT};
use teamdrive_session::store::{CheckoutStore, SessionStore};

#[tokio::test]
async fn test_logout_releases_seat_and_is_idempotent() {
    let harness = TestHarness::new(3, 0);
    let user = UserId::new();

    let admitted = harness
        .controller
        .admit(harness.request(user, SessionPriority::General))
        .await
        .expect("admit");
    let checkout_id = admitted.checkout.expect("checkout").id;

    assert_eq!(harness.pool_state().await.checked_out, 1);

    harness
        .controller
        .logout(admitted.session.id, user)
        .await
        .expect("logout");

    let session = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(session.terminated_reason.as_deref(), Some(REASON_LOGOUT));
    assert_eq!(session.terminated_by, Some(user));

    let checkout = harness
        .checkout_store
        .find_by_id(checkout_id)
        .await
        .expect("query")
        .expect("exists");
    assert!(!checkout.is_active);
    let first_checkin = checkout.checked_in_at;

    assert_eq!(harness.pool_state().await.checked_out, 0);

    // A second logout (expiry timer racing the explicit one) is a no-op.
    harness
        .controller
        .logout(admitted.session.id, user)
        .await
        .expect("duplicate logout is benign");

    let checkout = harness
        .checkout_store
        .find_by_id(checkout_id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(checkout.checked_in_at, first_checkin);
    assert_eq!(harness.pool_state().await.checked_out, 0);
}

#[tokio::test]
async fn test_expiry_sweep_terminates_and_frees_seats() {
    let harness = TestHarness::new(3, 0);
    let user = UserId::new();

    let admitted = harness
        .controller
        .admit(harness.request(user, SessionPriority::General))
        .await
        .expect("admit");

    // Force the session past its absolute expiry.
    let mut expired = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    expired.expires_at = Utc::now() - Duration::minutes(1);
    harness
        .session_store
        .insert(&expired)
        .await
        .expect("overwrite");

    let cleaned = harness.cleanup.run_sweep().await.expect("sweep");
    assert_eq!(cleaned, 1);

    let session = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(session.terminated_reason.as_deref(), Some(REASON_EXPIRED));
    assert!(session.terminated_by.is_none());

    assert_eq!(harness.pool_state().await.checked_out, 0);
}

#[tokio::test]
async fn test_idle_sweep_uses_idle_reason() {
    let harness = TestHarness::new(3, 0);

    let admitted = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect("admit");

    // Idle for longer than the 30-minute cutoff, but not expired.
    harness
        .session_store
        .touch_activity(admitted.session.id, Utc::now() - Duration::minutes(90))
        .await
        .expect("age");

    let cleaned = harness.cleanup.run_sweep().await.expect("sweep");
    assert_eq!(cleaned, 1);

    let session = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(session.terminated_reason.as_deref(), Some(REASON_IDLE));
}

#[tokio::test]
async fn test_heartbeat_and_ws_transitions_never_touch_the_pool() {
    let harness = TestHarness::new(3, 0);

    let admitted = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect("admit");
    let before = harness.pool_state().await;

    harness
        .controller
        .heartbeat(admitted.session.id, Some(PresenceStatus::Idle))
        .await
        .expect("heartbeat");
    harness
        .controller
        .set_ws_connected(admitted.session.id, true)
        .await
        .expect("connect");
    harness
        .controller
        .set_ws_connected(admitted.session.id, false)
        .await
        .expect("disconnect");

    let session = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(session.presence_status, PresenceStatus::Idle);
    assert!(!session.ws_connected);
    assert!(session.terminated_at.is_none());

    let after = harness.pool_state().await;
    assert_eq!(before.checked_out, after.checked_out);
    assert_eq!(before.available, after.available);
}

#[tokio::test]
async fn test_active_session_holds_exactly_one_active_checkout() {
    let harness = TestHarness::new(3, 0);
    let user = UserId::new();

    let admitted = harness
        .controller
        .admit(harness.request(user, SessionPriority::General))
        .await
        .expect("admit");

    let active = harness
        .checkout_store
        .find_active_by_session(admitted.session.id)
        .await
        .expect("query");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].user_id, user);

    harness
        .controller
        .logout(admitted.session.id, user)
        .await
        .expect("logout");

    let active = harness
        .checkout_store
        .find_active_by_session(admitted.session.id)
        .await
        .expect("query");
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_validate_terminates_expired_sessions() {
    let harness = TestHarness::new(3, 0);

    let admitted = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect("admit");

    let mut expired = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    expired.expires_at = Utc::now() - Duration::minutes(1);
    harness
        .session_store
        .insert(&expired)
        .await
        .expect("overwrite");

    harness
        .controller
        .validate(admitted.session.id)
        .await
        .expect_err("expired session is invalid");

    let session = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    assert!(session.terminated_at.is_some());
    assert_eq!(harness.pool_state().await.checked_out, 0);
}

#[tokio::test]
async fn test_admin_terminate_records_terminator_and_reason() {
    let harness = TestHarness::new(3, 0);
    let admin = UserId::new();

    let admitted = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect("admit");

    harness
        .controller
        .admin_terminate(admitted.session.id, admin, "policy violation")
        .await
        .expect("admin terminate");

    let session = harness
        .session_store
        .find_by_id(admitted.session.id)
        .await
        .expect("query")
        .expect("exists");
    assert_eq!(session.terminated_by, Some(admin));
    assert!(
        session
            .terminated_reason
            .as_deref()
            .expect("reason")
            .contains("policy violation")
    );

    // Terminating twice is a conflict for the admin surface.
    harness
        .controller
        .admin_terminate(admitted.session.id, admin, "again")
        .await
        .expect_err("already terminated");
}
