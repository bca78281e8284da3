//! Integration tests for overflow eviction.

mod helpers;

use chrono::{Duration, Utc};

use helpers::TestHarness;
use teamdrive_core::error::ErrorKind;
use teamdrive_core::types::id::UserId;
use teamdrive_entity::session::priority::SessionPriority;
use teamdrive_session::session::controller::REASON_OVERFLOW;
use teamdrive_session::store::{CheckoutStore, SessionStore};

#[tokio::test]
async fn test_admin_request_evicts_oldest_general_session() {
    // Pool of 3 with 1 reserved: two general seats.
    let harness = TestHarness::new(3, 1);
    let admin = UserId::new();

    let stale = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect("first general");
    let fresh = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect("second general");

    // Make the first session clearly the least recently active.
    harness
        .session_store
        .touch_activity(stale.session.id, Utc::now() - Duration::minutes(60))
        .await
        .expect("age stale session");
    harness
        .session_store
        .touch_activity(fresh.session.id, Utc::now() - Duration::minutes(1))
        .await
        .expect("age fresh session");

    // General requests do not preempt.
    let err = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect_err("pool exhausted for general");
    assert_eq!(err.kind, ErrorKind::SeatUnavailable);

    // The admin request evicts the stale session and takes its seat.
    let admitted = harness
        .controller
        .admit(harness.request(admin, SessionPriority::Admin))
        .await
        .expect("admin admission via eviction");

    assert_eq!(admitted.session.overflow_kicked, Some(stale.session.id));

    let victim = harness
        .session_store
        .find_by_id(stale.session.id)
        .await
        .expect("query")
        .expect("victim exists");
    assert_eq!(victim.terminated_reason.as_deref(), Some(REASON_OVERFLOW));
    assert_eq!(victim.terminated_by, Some(admin));

    let survivor = harness
        .session_store
        .find_by_id(fresh.session.id)
        .await
        .expect("query")
        .expect("survivor exists");
    assert!(survivor.terminated_at.is_none());

    // The victim's checkout was released; the pool is back at capacity.
    let victim_checkout = harness
        .checkout_store
        .find_by_id(stale.checkout.expect("checkout").id)
        .await
        .expect("query")
        .expect("checkout exists");
    assert!(!victim_checkout.is_active);

    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 2);
    assert_eq!(state.available, 0);
}

#[tokio::test]
async fn test_general_requests_never_preempt_each_other() {
    let harness = TestHarness::new(1, 0);

    let first = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect("first");

    let err = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect_err("no preemption between general logins");
    assert_eq!(err.kind, ErrorKind::SeatUnavailable);

    let untouched = harness
        .session_store
        .find_by_id(first.session.id)
        .await
        .expect("query")
        .expect("exists");
    assert!(untouched.terminated_at.is_none());
}

#[tokio::test]
async fn test_admin_request_fails_when_no_eligible_victim() {
    let harness = TestHarness::new(1, 0);

    // The only seat is held by another admin, which is protected.
    harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::Admin))
        .await
        .expect("first admin");

    let err = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::Admin))
        .await
        .expect_err("no evictable victim");
    assert_eq!(err.kind, ErrorKind::SeatUnavailable);

    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 1);
}
