//! Mock implementation of the license authority for development and testing.
//!
//! Simulates the external authority in-memory without a license server.
//! Failure injection (`set_unreachable`, `set_deny_all`) lets tests drive
//! the fail-closed and fail-open paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use teamdrive_core::types::id::UserId;

use crate::authority::{
    AuthorityError, CheckoutReply, ExternalPoolState, ExternalToken, LicenseAuthority,
};

#[derive(Debug, Default)]
struct MockState {
    /// Total seats per feature.
    total_seats: HashMap<String, u32>,
    /// Issued tokens: token -> feature.
    issued: HashMap<String, String>,
    /// When set, every call fails with `Unreachable`.
    unreachable: bool,
    /// When set, every checkout is denied.
    deny_all: bool,
}

/// In-memory license authority that mimics the real server's behavior.
#[derive(Debug, Default)]
pub struct MockLicenseAuthority {
    state: Mutex<MockState>,
}

impl MockLicenseAuthority {
    /// Create a new mock authority with no features configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total seats for a feature.
    pub fn set_total_seats(&self, feature: &str, seats: u32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.total_seats.insert(feature.to_string(), seats);
    }

    /// Toggle simulated unreachability.
    pub fn set_unreachable(&self, unreachable: bool) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.unreachable = unreachable;
    }

    /// Toggle denial of every checkout.
    pub fn set_deny_all(&self, deny_all: bool) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.deny_all = deny_all;
    }

    /// Number of tokens currently issued for a feature.
    pub fn issued_count(&self, feature: &str) -> u32 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.issued.values().filter(|f| f.as_str() == feature).count() as u32
    }

    /// Force the issued count for a feature without handing out tokens,
    /// to simulate external consumers the local ledger knows nothing
    /// about (drift).
    pub fn inject_external_checkouts(&self, feature: &str, count: u32) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for _ in 0..count {
            state
                .issued
                .insert(format!("ext-{}", Uuid::new_v4()), feature.to_string());
        }
    }
}

#[async_trait]
impl LicenseAuthority for MockLicenseAuthority {
    async fn checkout(
        &self,
        user_id: UserId,
        feature_name: &str,
    ) -> Result<CheckoutReply, AuthorityError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.unreachable {
            return Err(AuthorityError::Unreachable(
                "mock authority offline".to_string(),
            ));
        }

        if state.deny_all {
            return Ok(CheckoutReply::Denied {
                reason: "denied by policy".to_string(),
            });
        }

        let total = state.total_seats.get(feature_name).copied().unwrap_or(0);
        let issued = state
            .issued
            .values()
            .filter(|f| f.as_str() == feature_name)
            .count() as u32;

        if issued >= total {
            warn!(
                feature = %feature_name,
                issued = issued,
                total = total,
                "Mock authority denied checkout: no seats"
            );
            return Ok(CheckoutReply::Denied {
                reason: format!("no seats available for '{feature_name}' ({issued}/{total})"),
            });
        }

        let token = format!("mock-{}", Uuid::new_v4());
        state.issued.insert(token.clone(), feature_name.to_string());
        debug!(user_id = %user_id, token = %token, "Mock authority granted checkout");

        Ok(CheckoutReply::Granted(ExternalToken(token)))
    }

    async fn checkin(&self, token: &ExternalToken) -> Result<(), AuthorityError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.unreachable {
            return Err(AuthorityError::Unreachable(
                "mock authority offline".to_string(),
            ));
        }

        // Unknown tokens are a no-op: check-in is idempotent keyed by token.
        if state.issued.remove(token.as_str()).is_none() {
            debug!(token = %token, "Mock authority: token already checked in");
        }
        Ok(())
    }

    async fn report_state(&self, feature_name: &str) -> Result<ExternalPoolState, AuthorityError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if state.unreachable {
            return Err(AuthorityError::Unreachable(
                "mock authority offline".to_string(),
            ));
        }

        let total = state.total_seats.get(feature_name).copied().unwrap_or(0);
        let issued = state
            .issued
            .values()
            .filter(|f| f.as_str() == feature_name)
            .count() as u32;

        Ok(ExternalPoolState {
            feature_name: feature_name.to_string(),
            total_seats: total,
            checked_out: issued,
            reported_at: Utc::now(),
            source: "mock".to_string(),
        })
    }
}
