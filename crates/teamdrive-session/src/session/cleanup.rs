//! Expired and idle session sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use teamdrive_core::config::session::SessionConfig;
use teamdrive_core::result::AppResult;

use crate::store::SessionStore;

use super::controller::{REASON_EXPIRED, REASON_IDLE, SessionController};

/// Periodically terminates sessions past their absolute expiry or idle
/// cutoff, releasing their seats through the controller.
#[derive(Clone)]
pub struct SessionCleanup {
    /// Controller used for the termination path (seat release included).
    controller: Arc<SessionController>,
    /// Session store for the sweep query.
    session_store: Arc<dyn SessionStore>,
    /// Session configuration.
    config: SessionConfig,
}

impl std::fmt::Debug for SessionCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCleanup").finish()
    }
}

impl SessionCleanup {
    /// Create a new session cleanup handler.
    pub fn new(
        controller: Arc<SessionController>,
        session_store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            controller,
            session_store,
            config,
        }
    }

    /// Run one sweep, terminating all expired and idle sessions.
    ///
    /// Returns the number of sessions cleaned up.
    pub async fn run_sweep(&self) -> AppResult<u32> {
        let now = Utc::now();
        let idle_cutoff =
            now - chrono::Duration::minutes(self.config.idle_timeout_minutes as i64);

        let expired = self
            .session_store
            .find_expired_or_idle(now, idle_cutoff)
            .await?;

        if expired.is_empty() {
            return Ok(0);
        }

        info!(
            count = expired.len(),
            "Found expired/idle sessions to clean up"
        );

        let mut cleaned = 0u32;

        for session in &expired {
            let reason = if session.expires_at <= now {
                REASON_EXPIRED
            } else {
                REASON_IDLE
            };

            match self
                .controller
                .terminate_session(session.id, None, reason)
                .await
            {
                Ok(true) => cleaned += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(
                        session_id = %session.id,
                        error = %e,
                        "Failed to terminate expired session"
                    );
                }
            }
        }

        info!(cleaned = cleaned, "Session cleanup completed");

        Ok(cleaned)
    }

    /// Run the periodic sweep loop until cancelled.
    pub async fn run(&self, cancel: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.cleanup_interval_minutes * 60);
        info!(
            interval_secs = interval.as_secs(),
            "Session cleanup loop started"
        );

        let mut ticker = tokio::time::interval(interval);
        let mut cancel = cancel;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_sweep().await {
                        error!(error = %e, "Session cleanup sweep failed");
                    }
                }
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Session cleanup loop shutting down");
                        break;
                    }
                }
            }
        }
    }
}
