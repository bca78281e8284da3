//! Shared harness for admission-core integration tests.
//!
//! Builds the full controller stack against the in-memory stores and the
//! mock license authority, so tests exercise the real admission, eviction,
//! termination, and reconciliation flows without external services.

use std::sync::Arc;

use teamdrive_core::config::license::RetryConfig;
use teamdrive_core::config::session::{SessionConfig, SessionLimitsConfig};
use teamdrive_core::events::EventBus;
use teamdrive_core::types::id::UserId;
use teamdrive_entity::session::priority::SessionPriority;
use teamdrive_license::authority::LicenseAuthority;
use teamdrive_license::mock::MockLicenseAuthority;
use teamdrive_license::retry::RetryingAuthority;
use teamdrive_session::seat::ledger::{LedgerState, SeatLedger};
use teamdrive_session::seat::limiter::SessionLimiter;
use teamdrive_session::seat::memory::MemorySeatLedger;
use teamdrive_session::seat::reconciler::DriftReconciler;
use teamdrive_session::session::cleanup::SessionCleanup;
use teamdrive_session::session::controller::{AdmissionRequest, SessionController};
use teamdrive_session::store::memory::{
    MemoryCheckoutStore, MemorySessionLimitStore, MemorySessionStore, MemorySnapshotStore,
};
use teamdrive_session::store::{CheckoutStore, SessionStore};

/// Feature name used across the tests.
pub const FEATURE: &str = "meridian_teamdrive";

/// Fully wired admission core over in-memory stores.
pub struct TestHarness {
    pub controller: Arc<SessionController>,
    pub cleanup: SessionCleanup,
    pub reconciler: DriftReconciler,
    pub ledger: Arc<dyn SeatLedger>,
    pub authority: Arc<MockLicenseAuthority>,
    pub session_store: Arc<MemorySessionStore>,
    pub checkout_store: Arc<MemoryCheckoutStore>,
    pub snapshot_store: Arc<MemorySnapshotStore>,
    pub limiter: Arc<SessionLimiter>,
    pub events: EventBus,
}

impl TestHarness {
    /// Harness with the given pool shape and no default session limit.
    pub fn new(total_seats: u32, admin_reserved: u32) -> Self {
        Self::with_limits(total_seats, admin_reserved, 0)
    }

    /// Harness with a default per-user session limit (`0` = unlimited).
    pub fn with_limits(total_seats: u32, admin_reserved: u32, default_max_sessions: u32) -> Self {
        let ledger: Arc<dyn SeatLedger> =
            Arc::new(MemorySeatLedger::new(total_seats, admin_reserved));

        let mock = Arc::new(MockLicenseAuthority::new());
        mock.set_total_seats(FEATURE, total_seats);
        let authority: Arc<dyn LicenseAuthority> = Arc::new(RetryingAuthority::new(
            mock.clone(),
            RetryConfig {
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
        ));

        let session_store = Arc::new(MemorySessionStore::new());
        let checkout_store = Arc::new(MemoryCheckoutStore::new());
        let snapshot_store = Arc::new(MemorySnapshotStore::new());
        let limit_store = Arc::new(MemorySessionLimitStore::new());

        let session_config = SessionConfig {
            idle_timeout_minutes: 30,
            absolute_timeout_hours: 12,
            cleanup_interval_minutes: 15,
            limits: SessionLimitsConfig {
                enabled: true,
                default_max_sessions,
            },
        };

        let events = EventBus::new(64);
        let limiter = Arc::new(SessionLimiter::new(
            limit_store,
            session_config.limits.clone(),
        ));

        let controller = Arc::new(SessionController::new(
            Arc::clone(&ledger),
            Arc::clone(&authority),
            session_store.clone() as Arc<dyn SessionStore>,
            checkout_store.clone() as Arc<dyn CheckoutStore>,
            Arc::clone(&limiter),
            events.clone(),
            session_config.clone(),
            FEATURE,
        ));

        let cleanup = SessionCleanup::new(
            Arc::clone(&controller),
            session_store.clone() as Arc<dyn SessionStore>,
            session_config,
        );

        let reconciler = DriftReconciler::new(
            Arc::clone(&ledger),
            Arc::clone(&authority),
            session_store.clone() as Arc<dyn SessionStore>,
            checkout_store.clone() as Arc<dyn CheckoutStore>,
            snapshot_store.clone(),
            events.clone(),
            FEATURE,
        );

        Self {
            controller,
            cleanup,
            reconciler,
            ledger,
            authority: mock,
            session_store,
            checkout_store,
            snapshot_store,
            limiter,
            events,
        }
    }

    /// Build an admission request for a user.
    pub fn request(&self, user_id: UserId, priority: SessionPriority) -> AdmissionRequest {
        AdmissionRequest {
            user_id,
            priority,
            token_hash: format!("hash-{}", uuid::Uuid::new_v4()),
            refresh_token_hash: None,
            ip_address: "127.0.0.1".parse().expect("ip"),
            user_agent: Some("teamdrive-tests".to_string()),
            device_info: None,
            seat_exempt: false,
        }
    }

    /// Current ledger state.
    pub async fn pool_state(&self) -> LedgerState {
        self.ledger.current_state().await.expect("ledger state")
    }
}
