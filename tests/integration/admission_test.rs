//! Integration tests for seat admission and session limits.

mod helpers;

use futures::future::join_all;

use helpers::TestHarness;
use teamdrive_core::error::ErrorKind;
use teamdrive_core::types::id::UserId;
use teamdrive_entity::session::priority::SessionPriority;
use teamdrive_session::store::CheckoutStore;

#[tokio::test]
async fn test_concurrent_admissions_grant_exactly_available_seats() {
    const TOTAL: u32 = 4;
    const REQUESTS: usize = 12;

    let harness = TestHarness::new(TOTAL, 0);

    let attempts = (0..REQUESTS).map(|_| {
        let controller = harness.controller.clone();
        let request = harness.request(UserId::new(), SessionPriority::General);
        tokio::spawn(async move { controller.admit(request).await })
    });

    let results = join_all(attempts).await;
    let mut granted = 0usize;
    let mut denied = 0usize;

    for result in results {
        match result.expect("join") {
            Ok(_) => granted += 1,
            Err(e) => {
                assert_eq!(e.kind, ErrorKind::SeatUnavailable);
                denied += 1;
            }
        }
    }

    assert_eq!(granted, TOTAL as usize);
    assert_eq!(denied, REQUESTS - TOTAL as usize);

    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, TOTAL);
    assert_eq!(state.available, 0);
    assert_eq!(
        harness.checkout_store.count_active().await.expect("count"),
        TOTAL as i64
    );
}

#[tokio::test]
async fn test_admin_reserved_seats_are_withheld_from_general_requests() {
    let harness = TestHarness::new(3, 1);

    for _ in 0..2 {
        harness
            .controller
            .admit(harness.request(UserId::new(), SessionPriority::General))
            .await
            .expect("general admission within capacity");
    }

    let err = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect_err("third general admission must fail");
    assert_eq!(err.kind, ErrorKind::SeatUnavailable);

    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 2);
    assert_eq!(state.available, 0);
}

#[tokio::test]
async fn test_session_limit_rejected_before_seat_is_touched() {
    let harness = TestHarness::new(10, 0);
    let user = UserId::new();
    let admin = UserId::new();

    harness
        .limiter
        .set_user_limit(user, 1, Some("single-seat account"), admin)
        .await
        .expect("set limit");

    harness
        .controller
        .admit(harness.request(user, SessionPriority::General))
        .await
        .expect("first login");

    let err = harness
        .controller
        .admit(harness.request(user, SessionPriority::General))
        .await
        .expect_err("second login must hit the limit");
    assert_eq!(err.kind, ErrorKind::SessionLimit);

    // The denied request never reached the pool or the authority.
    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 1);
    assert_eq!(harness.authority.issued_count(helpers::FEATURE), 1);
}

#[tokio::test]
async fn test_limit_rejection_is_distinct_from_pool_exhaustion() {
    let harness = TestHarness::with_limits(1, 0, 1);
    let first = UserId::new();
    let second = UserId::new();

    harness
        .controller
        .admit(harness.request(first, SessionPriority::General))
        .await
        .expect("first login");

    // Same user again: limit error. Different user: seat error.
    let limit_err = harness
        .controller
        .admit(harness.request(first, SessionPriority::General))
        .await
        .expect_err("limit");
    assert_eq!(limit_err.kind, ErrorKind::SessionLimit);

    let seat_err = harness
        .controller
        .admit(harness.request(second, SessionPriority::General))
        .await
        .expect_err("pool exhausted");
    assert_eq!(seat_err.kind, ErrorKind::SeatUnavailable);
}

#[tokio::test]
async fn test_allocation_fails_closed_when_authority_unreachable() {
    let harness = TestHarness::new(5, 0);
    harness.authority.set_unreachable(true);

    let err = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect_err("fail closed");
    assert_eq!(err.kind, ErrorKind::SeatUnavailable);

    // The ledger hold was rolled back.
    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 0);
    assert_eq!(
        harness.checkout_store.count_active().await.expect("count"),
        0
    );
}

#[tokio::test]
async fn test_authority_denial_rolls_back_the_hold() {
    let harness = TestHarness::new(5, 0);
    harness.authority.set_deny_all(true);

    let err = harness
        .controller
        .admit(harness.request(UserId::new(), SessionPriority::General))
        .await
        .expect_err("denied");
    assert_eq!(err.kind, ErrorKind::SeatUnavailable);

    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 0);
}

#[tokio::test]
async fn test_seat_exempt_admission_bypasses_pool_and_limits() {
    // Zero-seat pool: only an exempt session can be admitted at all.
    let harness = TestHarness::with_limits(0, 0, 1);
    let user = UserId::new();

    let mut request = harness.request(user, SessionPriority::Admin);
    request.seat_exempt = true;

    let admitted = harness.controller.admit(request).await.expect("exempt");
    assert!(admitted.checkout.is_none());
    assert!(admitted.session.checkout_id.is_none());

    let state = harness.pool_state().await;
    assert_eq!(state.checked_out, 0);
}
