//! Session lifecycle controller — admission, heartbeats, termination.
//!
//! Orchestrates login → seat request → session creation and
//! termination → seat release. The controller owns every session state
//! transition; seat-count arithmetic is delegated to the ledger and the
//! external confirm to the license authority client.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use teamdrive_core::config::session::SessionConfig;
use teamdrive_core::error::AppError;
use teamdrive_core::events::{DomainEvent, EventBus, SessionEvent};
use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{SessionId, UserId};
use teamdrive_entity::presence::PresenceStatus;
use teamdrive_entity::seat::checkout::SeatCheckout;
use teamdrive_entity::session::model::Session;
use teamdrive_entity::session::priority::SessionPriority;
use teamdrive_license::authority::{CheckoutReply, ExternalToken, LicenseAuthority};

use crate::seat::eviction::{EvictionState, OverflowEviction};
use crate::seat::ledger::{AllocationOutcome, SeatHold, SeatLedger};
use crate::seat::limiter::{LimitDecision, SessionLimiter};
use crate::store::{CheckoutStore, SessionStore};

/// Termination reason recorded when a session is evicted for overflow.
pub const REASON_OVERFLOW: &str = "overflow";
/// Termination reason for an explicit logout.
pub const REASON_LOGOUT: &str = "logout";
/// Termination reason for absolute expiry.
pub const REASON_EXPIRED: &str = "expired";
/// Termination reason for idle timeout.
pub const REASON_IDLE: &str = "idle timeout";

/// A request for seat admission. The caller has already been
/// authenticated; credential verification never happens here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRequest {
    /// The authenticated user.
    pub user_id: UserId,
    /// Priority class (decides preemption rights).
    pub priority: SessionPriority,
    /// SHA-256 hash of the issued access token.
    pub token_hash: String,
    /// SHA-256 hash of the issued refresh token.
    pub refresh_token_hash: Option<String>,
    /// Client IP address.
    pub ip_address: std::net::IpAddr,
    /// Client User-Agent.
    pub user_agent: Option<String>,
    /// Parsed device info.
    pub device_info: Option<serde_json::Value>,
    /// Administrative exemption: bypass the limiter and the seat pool.
    /// The resulting session holds no checkout.
    pub seat_exempt: bool,
}

/// Result of a successful admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmittedSession {
    /// The created session.
    pub session: Session,
    /// The checkout granting its seat (None for seat-exempt sessions).
    pub checkout: Option<SeatCheckout>,
}

/// Manages the complete session lifecycle.
#[derive(Clone)]
pub struct SessionController {
    /// Seat ledger for pool arithmetic.
    ledger: Arc<dyn SeatLedger>,
    /// External license authority (already wrapped with retry semantics).
    authority: Arc<dyn LicenseAuthority>,
    /// Session persistence.
    session_store: Arc<dyn SessionStore>,
    /// Checkout audit persistence.
    checkout_store: Arc<dyn CheckoutStore>,
    /// Per-user session limits.
    limiter: Arc<SessionLimiter>,
    /// Event bus for produced events.
    events: EventBus,
    /// Session configuration.
    config: SessionConfig,
    /// Licensed feature consumed by each seat.
    feature_name: String,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("feature_name", &self.feature_name)
            .field("config", &self.config)
            .finish()
    }
}

impl SessionController {
    /// Create a new session controller with all required dependencies.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        authority: Arc<dyn LicenseAuthority>,
        session_store: Arc<dyn SessionStore>,
        checkout_store: Arc<dyn CheckoutStore>,
        limiter: Arc<SessionLimiter>,
        events: EventBus,
        config: SessionConfig,
        feature_name: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            authority,
            session_store,
            checkout_store,
            limiter,
            events,
            config,
            feature_name: feature_name.into(),
        }
    }

    /// Perform the complete admission flow:
    ///
    /// 1. Check the per-user session limit (before any seat arithmetic)
    /// 2. Allocate a seat from the ledger, evicting if the requester
    ///    may preempt
    /// 3. Confirm the checkout with the external authority (fail-closed)
    /// 4. Persist the checkout and session records
    ///
    /// Any failure after step 2 rolls the ledger hold back; any failure
    /// after step 3 also returns the external token.
    pub async fn admit(&self, request: AdmissionRequest) -> AppResult<AdmittedSession> {
        if request.seat_exempt {
            return self.admit_exempt(request).await;
        }

        // Step 1: session limit, on its own axis before the pool is touched.
        let active_count = self
            .session_store
            .count_active_by_user(request.user_id)
            .await? as u32;

        if let LimitDecision::LimitExceeded { max } = self
            .limiter
            .check_limit(request.user_id, active_count)
            .await?
        {
            info!(
                user_id = %request.user_id,
                active = active_count,
                max = max,
                "Admission rejected: session limit"
            );
            return Err(AppError::session_limit(format!(
                "Maximum concurrent sessions ({max}) reached. Log out of another session first."
            )));
        }

        // Step 2: seat allocation, possibly via eviction.
        let (hold, evicted) = match self.allocate_seat(&request).await? {
            Some(pair) => pair,
            None => {
                let reason = "All available seats are occupied".to_string();
                warn!(user_id = %request.user_id, "Admission rejected: {reason}");
                self.events
                    .publish(DomainEvent::Session(SessionEvent::SeatDenied {
                        user_id: request.user_id,
                        reason: reason.clone(),
                    }));
                return Err(AppError::seat_unavailable(reason));
            }
        };

        // Step 3: external confirm. The authority client carries its own
        // bounded timeout and retry budget; allocation fails closed.
        let token = match self
            .authority
            .checkout(request.user_id, &self.feature_name)
            .await
        {
            Ok(CheckoutReply::Granted(token)) => token,
            Ok(CheckoutReply::Denied { reason }) => {
                let _ = self.ledger.release(hold.checkout_id).await;
                warn!(
                    user_id = %request.user_id,
                    reason = %reason,
                    "Authority denied checkout"
                );
                self.events
                    .publish(DomainEvent::Session(SessionEvent::SeatDenied {
                        user_id: request.user_id,
                        reason: reason.clone(),
                    }));
                return Err(AppError::seat_unavailable(format!(
                    "Checkout denied by license authority: {reason}"
                )));
            }
            Err(e) if e.is_unreachable() => {
                let _ = self.ledger.release(hold.checkout_id).await;
                warn!(
                    user_id = %request.user_id,
                    error = %e,
                    "Authority unreachable after retry budget, failing closed"
                );
                self.events
                    .publish(DomainEvent::Session(SessionEvent::SeatDenied {
                        user_id: request.user_id,
                        reason: "license authority unreachable".to_string(),
                    }));
                return Err(AppError::seat_unavailable(
                    "License authority unreachable; seat admission failed closed",
                ));
            }
            Err(e) => {
                let _ = self.ledger.release(hold.checkout_id).await;
                return Err(AppError::external_service(format!(
                    "License authority fault: {e}"
                )));
            }
        };

        // Step 4: persist. From here the seat is committed unless the
        // records cannot be written, in which case everything rolls back.
        match self
            .create_session_records(&request, &hold, &token, evicted)
            .await
        {
            Ok(admitted) => {
                info!(
                    user_id = %request.user_id,
                    session_id = %admitted.session.id,
                    checkout_id = %hold.checkout_id,
                    "Admission successful"
                );
                self.events
                    .publish(DomainEvent::Session(SessionEvent::Created {
                        session_id: admitted.session.id,
                        user_id: request.user_id,
                        ip_address: request.ip_address.to_string(),
                    }));
                Ok(admitted)
            }
            Err(e) => {
                error!(
                    user_id = %request.user_id,
                    error = %e,
                    "Failed to persist admission, rolling back seat"
                );
                if let Err(checkin_err) = self.authority.checkin(&token).await {
                    warn!(
                        token = %token,
                        error = %checkin_err,
                        "Rollback check-in failed; left for reconciliation"
                    );
                }
                let _ = self.ledger.release(hold.checkout_id).await;
                Err(e)
            }
        }
    }

    /// Admission for seat-exempt administrative sessions: no limiter, no
    /// ledger, no checkout.
    async fn admit_exempt(&self, request: AdmissionRequest) -> AppResult<AdmittedSession> {
        let session = self.build_session(&request, None);
        self.session_store.insert(&session).await?;

        info!(
            user_id = %request.user_id,
            session_id = %session.id,
            "Seat-exempt session admitted"
        );
        self.events
            .publish(DomainEvent::Session(SessionEvent::Created {
                session_id: session.id,
                user_id: request.user_id,
                ip_address: request.ip_address.to_string(),
            }));

        Ok(AdmittedSession {
            session,
            checkout: None,
        })
    }

    /// Try to allocate a seat; when the pool is exhausted and the
    /// requester may preempt, run one eviction-then-retry pass.
    ///
    /// Returns the hold and the evicted session's ID, or `None` when no
    /// seat could be obtained. The flow is a three-state machine driven
    /// iteratively — never recursive — so a victim's termination cannot
    /// trigger a second eviction within the same attempt.
    async fn allocate_seat(
        &self,
        request: &AdmissionRequest,
    ) -> AppResult<Option<(SeatHold, Option<SessionId>)>> {
        if let AllocationOutcome::Granted(hold) = self
            .ledger
            .try_allocate(request.user_id, &self.feature_name)
            .await?
        {
            return Ok(Some((hold, None)));
        }

        if !request.priority.can_preempt() {
            return Ok(None);
        }

        let mut state = EvictionState::Requested;
        debug!(?state, user_id = %request.user_id, "Pool exhausted, evaluating eviction");

        let candidates = self.session_store.find_evictable().await?;
        let Some(victim) = OverflowEviction::select_victim(&candidates) else {
            debug!(user_id = %request.user_id, "No eligible eviction victim");
            return Ok(None);
        };
        let victim_id = victim.id;

        state = EvictionState::Evicting { victim: victim_id };
        info!(
            ?state,
            victim = %victim_id,
            victim_user = %victim.user_id,
            requester = %request.user_id,
            "Evicting session for overflow"
        );

        self.terminate_session(victim_id, Some(request.user_id), REASON_OVERFLOW)
            .await?;

        // Retry exactly once; a second failure is final.
        match self
            .ledger
            .try_allocate(request.user_id, &self.feature_name)
            .await?
        {
            AllocationOutcome::Granted(hold) => {
                state = EvictionState::Resolved { granted: true };
                debug!(?state, "Post-eviction retry granted a seat");
                Ok(Some((hold, Some(victim_id))))
            }
            AllocationOutcome::SeatUnavailable => {
                state = EvictionState::Resolved { granted: false };
                warn!(?state, "Seat still unavailable after eviction");
                Ok(None)
            }
        }
    }

    /// Persist the session and checkout rows for a confirmed admission.
    async fn create_session_records(
        &self,
        request: &AdmissionRequest,
        hold: &SeatHold,
        token: &ExternalToken,
        evicted: Option<SessionId>,
    ) -> AppResult<AdmittedSession> {
        let mut session = self.build_session(request, evicted);
        self.session_store.insert(&session).await?;

        let checkout = SeatCheckout {
            id: hold.checkout_id,
            session_id: Some(session.id),
            user_id: request.user_id,
            feature_name: hold.feature_name.clone(),
            external_token: token.as_str().to_string(),
            checked_out_at: hold.allocated_at,
            checked_in_at: None,
            ip_address: Some(request.ip_address),
            is_active: true,
        };
        self.checkout_store.insert(&checkout).await?;

        let allocated_at = Utc::now();
        self.session_store
            .set_checkout(session.id, checkout.id, allocated_at)
            .await?;
        session.checkout_id = Some(checkout.id);
        session.seat_allocated_at = Some(allocated_at);

        Ok(AdmittedSession {
            session,
            checkout: Some(checkout),
        })
    }

    /// Construct the session entity for an admission request.
    fn build_session(&self, request: &AdmissionRequest, evicted: Option<SessionId>) -> Session {
        let now = Utc::now();
        Session {
            id: SessionId::new(),
            user_id: request.user_id,
            token_hash: request.token_hash.clone(),
            refresh_token_hash: request.refresh_token_hash.clone(),
            ip_address: request.ip_address,
            user_agent: request.user_agent.clone(),
            device_info: request.device_info.clone(),
            priority: request.priority,
            checkout_id: None,
            seat_allocated_at: None,
            overflow_kicked: evicted,
            presence_status: PresenceStatus::Active,
            ws_connected: false,
            ws_connected_at: None,
            terminated_by: None,
            terminated_reason: None,
            terminated_at: None,
            created_at: now,
            expires_at: now + Duration::hours(self.config.absolute_timeout_hours as i64),
            last_activity: now,
        }
    }

    /// Terminate a session and synchronously release its seat.
    ///
    /// Returns `false` if the session was already terminated — duplicate
    /// triggers (expiry timer racing an explicit logout) are expected and
    /// benign.
    pub async fn terminate_session(
        &self,
        session_id: SessionId,
        terminated_by: Option<UserId>,
        reason: &str,
    ) -> AppResult<bool> {
        let session = self
            .session_store
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))?;

        let newly_terminated = self
            .session_store
            .terminate(session_id, terminated_by, reason, Utc::now())
            .await?;

        if !newly_terminated {
            debug!(session_id = %session_id, "Session already terminated");
            return Ok(false);
        }

        self.release_session_seat(&session).await;

        info!(
            session_id = %session_id,
            user_id = %session.user_id,
            reason = %reason,
            "Session terminated"
        );
        self.events
            .publish(DomainEvent::Session(SessionEvent::Terminated {
                session_id,
                user_id: session.user_id,
                terminated_by,
                reason: reason.to_string(),
            }));

        Ok(true)
    }

    /// Release every active checkout a session holds.
    ///
    /// Check-in is fail-open: external unreachability never blocks it,
    /// because a blocked check-in would leak the seat. The local ledger
    /// and checkout row are always updated; a failed external check-in is
    /// logged and left for the reconciler to surface.
    async fn release_session_seat(&self, session: &Session) {
        let checkouts = match self
            .checkout_store
            .find_active_by_session(session.id)
            .await
        {
            Ok(checkouts) => checkouts,
            Err(e) => {
                error!(
                    session_id = %session.id,
                    error = %e,
                    "Failed to look up checkouts during termination"
                );
                return;
            }
        };

        for checkout in &checkouts {
            if let Err(e) = self.ledger.release(checkout.id).await {
                error!(
                    checkout_id = %checkout.id,
                    error = %e,
                    "Ledger release failed during termination"
                );
            }

            let token = ExternalToken(checkout.external_token.clone());
            if let Err(e) = self.authority.checkin(&token).await {
                warn!(
                    checkout_id = %checkout.id,
                    error = %e,
                    "External check-in failed; seat freed locally, left for reconciliation"
                );
            }

            if let Err(e) = self.checkout_store.checkin(checkout.id, Utc::now()).await {
                error!(
                    checkout_id = %checkout.id,
                    error = %e,
                    "Failed to mark checkout inactive"
                );
            }
        }
    }

    /// Explicit logout. Idempotent: logging out an already terminated
    /// session is a no-op.
    pub async fn logout(&self, session_id: SessionId, user_id: UserId) -> AppResult<()> {
        self.terminate_session(session_id, Some(user_id), REASON_LOGOUT)
            .await?;
        Ok(())
    }

    /// Terminate a session on behalf of an administrator.
    pub async fn admin_terminate(
        &self,
        session_id: SessionId,
        admin_id: UserId,
        reason: &str,
    ) -> AppResult<()> {
        let session = self
            .session_store
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session not found"))?;

        if session.terminated_at.is_some() {
            return Err(AppError::conflict("Session is already terminated"));
        }

        self.terminate_session(
            session_id,
            Some(admin_id),
            &format!("admin termination: {reason}"),
        )
        .await?;
        Ok(())
    }

    /// Terminate all active sessions for a specific user.
    pub async fn terminate_all_for_user(
        &self,
        user_id: UserId,
        admin_id: UserId,
        reason: &str,
    ) -> AppResult<u32> {
        let sessions = self.session_store.find_active_by_user(user_id).await?;
        let mut terminated = 0u32;

        for session in &sessions {
            match self
                .terminate_session(session.id, Some(admin_id), reason)
                .await
            {
                Ok(true) => terminated += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        session_id = %session.id,
                        error = %e,
                        "Failed to terminate session"
                    );
                }
            }
        }

        Ok(terminated)
    }

    /// Record a heartbeat: bump activity and optionally update presence.
    /// Heartbeats never touch seat accounting.
    pub async fn heartbeat(
        &self,
        session_id: SessionId,
        presence: Option<PresenceStatus>,
    ) -> AppResult<()> {
        self.session_store
            .touch_activity(session_id, Utc::now())
            .await?;
        if let Some(status) = presence {
            self.session_store.set_presence(session_id, status).await?;
        }
        Ok(())
    }

    /// Update the realtime connection flag. Connection and disconnection
    /// of the realtime channel are independent of seat possession.
    pub async fn set_ws_connected(&self, session_id: SessionId, connected: bool) -> AppResult<()> {
        let at = connected.then(Utc::now);
        self.session_store
            .set_ws_connected(session_id, connected, at)
            .await
    }

    /// Validate that a session is live, terminating it if it has expired
    /// or idled out.
    pub async fn validate(&self, session_id: SessionId) -> AppResult<Session> {
        let session = self
            .session_store
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::session("Session not found"))?;

        if session.terminated_at.is_some() {
            return Err(AppError::session("Session has been terminated"));
        }

        if session.is_expired() {
            self.terminate_session(session_id, None, REASON_EXPIRED)
                .await?;
            return Err(AppError::session("Session has expired"));
        }

        let idle_cutoff =
            Utc::now() - Duration::minutes(self.config.idle_timeout_minutes as i64);
        if session.last_activity < idle_cutoff {
            self.terminate_session(session_id, None, REASON_IDLE).await?;
            return Err(AppError::session("Session expired due to inactivity"));
        }

        Ok(session)
    }

    /// The session store this controller operates on.
    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.session_store
    }

    /// The session limiter.
    pub fn limiter(&self) -> &Arc<SessionLimiter> {
        &self.limiter
    }
}
