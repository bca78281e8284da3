//! In-memory seat ledger using a Tokio mutex for single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{CheckoutId, UserId};

use super::ledger::{AllocationOutcome, LedgerState, ReleaseOutcome, SeatHold, SeatLedger};

/// Internal state for the memory-based seat ledger.
#[derive(Debug)]
struct InnerState {
    /// Total seats in the pool.
    total_seats: u32,
    /// Seats withheld from general allocation.
    admin_reserved: u32,
    /// Seats currently held, keyed by checkout ID.
    holds: HashMap<CheckoutId, SeatHold>,
}

impl InnerState {
    fn checked_out(&self) -> u32 {
        self.holds.len() as u32
    }

    fn available(&self) -> u32 {
        self.total_seats
            .saturating_sub(self.admin_reserved)
            .saturating_sub(self.checked_out())
    }
}

/// In-memory seat ledger using a Tokio mutex as the serialization domain.
///
/// Admin-reserved seats are hard headroom: no allocation path may consume
/// them, so `checked_out <= total_seats - admin_reserved` holds in every
/// reachable state. Admin priority is expressed through the overflow
/// eviction policy, not through reserved-seat dipping.
#[derive(Debug, Clone)]
pub struct MemorySeatLedger {
    /// Protected inner state.
    state: Arc<Mutex<InnerState>>,
}

impl MemorySeatLedger {
    /// Create a new memory-based seat ledger.
    pub fn new(total_seats: u32, admin_reserved: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(InnerState {
                total_seats,
                admin_reserved,
                holds: HashMap::new(),
            })),
        }
    }
}

#[async_trait]
impl SeatLedger for MemorySeatLedger {
    async fn try_allocate(
        &self,
        user_id: UserId,
        feature_name: &str,
    ) -> AppResult<AllocationOutcome> {
        let mut state = self.state.lock().await;

        if state.available() == 0 {
            return Ok(AllocationOutcome::SeatUnavailable);
        }

        let hold = SeatHold {
            checkout_id: CheckoutId::new(),
            user_id,
            feature_name: feature_name.to_string(),
            allocated_at: Utc::now(),
        };
        state.holds.insert(hold.checkout_id, hold.clone());

        info!(
            user_id = %user_id,
            checkout_id = %hold.checkout_id,
            checked_out = state.checked_out(),
            total = state.total_seats,
            "Seat allocated"
        );

        Ok(AllocationOutcome::Granted(hold))
    }

    async fn release(&self, checkout_id: CheckoutId) -> AppResult<ReleaseOutcome> {
        let mut state = self.state.lock().await;

        if state.holds.remove(&checkout_id).is_some() {
            info!(
                checkout_id = %checkout_id,
                checked_out = state.checked_out(),
                "Seat released"
            );
            Ok(ReleaseOutcome::Released)
        } else {
            Ok(ReleaseOutcome::AlreadyReleased)
        }
    }

    async fn current_state(&self) -> AppResult<LedgerState> {
        let state = self.state.lock().await;
        Ok(LedgerState {
            total_seats: state.total_seats,
            admin_reserved: state.admin_reserved,
            checked_out: state.checked_out(),
            available: state.available(),
        })
    }

    async fn set_total_seats(&self, total: u32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if total < state.checked_out() + state.admin_reserved {
            // Existing holds are never evicted by a capacity shrink; the
            // reconciler surfaces the overcommit as drift.
            warn!(
                total = total,
                checked_out = state.checked_out(),
                "Total seats set below current usage"
            );
        }
        state.total_seats = total;
        info!(total = total, "Total seats updated");
        Ok(())
    }

    async fn set_admin_reserved(&self, reserved: u32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.admin_reserved = reserved;
        info!(reserved = reserved, "Admin reserved seats updated");
        Ok(())
    }

    async fn restore(&self, holds: Vec<SeatHold>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.holds.clear();
        let count = holds.len();
        for hold in holds {
            state.holds.insert(hold.checkout_id, hold);
        }
        info!(restored = count, "Ledger holds restored from persisted checkouts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    const FEATURE: &str = "meridian_teamdrive";

    async fn assert_invariants(ledger: &MemorySeatLedger) {
        let state = ledger.current_state().await.expect("state");
        assert!(state.checked_out <= state.total_seats - state.admin_reserved);
        assert_eq!(
            state.available,
            state.total_seats - state.admin_reserved - state.checked_out
        );
    }

    #[tokio::test]
    async fn test_allocate_until_exhausted() {
        let ledger = MemorySeatLedger::new(3, 1);

        for _ in 0..2 {
            let outcome = ledger
                .try_allocate(UserId::new(), FEATURE)
                .await
                .expect("allocate");
            assert!(matches!(outcome, AllocationOutcome::Granted(_)));
            assert_invariants(&ledger).await;
        }

        // Third general allocation must fail: one seat is admin headroom.
        let outcome = ledger
            .try_allocate(UserId::new(), FEATURE)
            .await
            .expect("allocate");
        assert!(matches!(outcome, AllocationOutcome::SeatUnavailable));
        assert_invariants(&ledger).await;
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let ledger = MemorySeatLedger::new(2, 0);
        let hold = match ledger
            .try_allocate(UserId::new(), FEATURE)
            .await
            .expect("allocate")
        {
            AllocationOutcome::Granted(hold) => hold,
            other => panic!("expected grant, got {other:?}"),
        };

        assert_eq!(
            ledger.release(hold.checkout_id).await.expect("release"),
            ReleaseOutcome::Released
        );
        let state_after_first = ledger.current_state().await.expect("state");

        assert_eq!(
            ledger.release(hold.checkout_id).await.expect("release"),
            ReleaseOutcome::AlreadyReleased
        );
        let state_after_second = ledger.current_state().await.expect("state");

        assert_eq!(state_after_first.checked_out, state_after_second.checked_out);
        assert_eq!(state_after_first.checked_out, 0);
        assert_invariants(&ledger).await;
    }

    #[tokio::test]
    async fn test_concurrent_allocations_grant_exactly_available() {
        const TOTAL: u32 = 8;
        const RESERVED: u32 = 2;
        const REQUESTS: usize = 40;

        let ledger = MemorySeatLedger::new(TOTAL, RESERVED);

        let attempts = (0..REQUESTS).map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.try_allocate(UserId::new(), FEATURE).await })
        });

        let outcomes = join_all(attempts).await;
        let granted = outcomes
            .into_iter()
            .filter(|r| {
                matches!(
                    r.as_ref().expect("join").as_ref().expect("allocate"),
                    AllocationOutcome::Granted(_)
                )
            })
            .count();

        assert_eq!(granted as u32, TOTAL - RESERVED);
        assert_invariants(&ledger).await;
    }

    #[tokio::test]
    async fn test_restore_rebuilds_holds() {
        let ledger = MemorySeatLedger::new(5, 0);
        let holds = vec![
            SeatHold {
                checkout_id: CheckoutId::new(),
                user_id: UserId::new(),
                feature_name: FEATURE.to_string(),
                allocated_at: Utc::now(),
            },
            SeatHold {
                checkout_id: CheckoutId::new(),
                user_id: UserId::new(),
                feature_name: FEATURE.to_string(),
                allocated_at: Utc::now(),
            },
        ];

        ledger.restore(holds).await.expect("restore");
        let state = ledger.current_state().await.expect("state");
        assert_eq!(state.checked_out, 2);
        assert_eq!(state.available, 3);
    }

    #[tokio::test]
    async fn test_shrinking_total_keeps_holds() {
        let ledger = MemorySeatLedger::new(4, 0);
        for _ in 0..3 {
            ledger
                .try_allocate(UserId::new(), FEATURE)
                .await
                .expect("allocate");
        }

        ledger.set_total_seats(2).await.expect("set total");
        let state = ledger.current_state().await.expect("state");
        assert_eq!(state.checked_out, 3);
        assert_eq!(state.available, 0);
    }
}
