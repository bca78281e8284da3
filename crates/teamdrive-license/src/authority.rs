//! License authority trait and shared types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use teamdrive_core::types::id::UserId;

/// Opaque checkout token issued by the external authority.
///
/// The authority's `checkout`, `checkin`, and retries are idempotent keyed
/// by this token; the core never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalToken(pub String);

impl ExternalToken {
    /// Borrow the raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a checkout request against the authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CheckoutReply {
    /// The authority granted a seat and issued a token.
    Granted(ExternalToken),
    /// The authority denied the checkout. Denials are final and never
    /// retried.
    Denied {
        /// Reason reported by the authority.
        reason: String,
    },
}

/// Pool state as reported by the external authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalPoolState {
    /// Feature the report covers.
    pub feature_name: String,
    /// Total seats in the license.
    pub total_seats: u32,
    /// Seats the authority believes are checked out.
    pub checked_out: u32,
    /// When the report was produced.
    pub reported_at: DateTime<Utc>,
    /// Where the reading came from (endpoint or `"mock"`).
    pub source: String,
}

/// Transport-level failures talking to the authority.
///
/// `Unreachable` is the only retryable variant; everything else is a
/// hard fault surfaced to the caller.
#[derive(Debug, Clone, Error)]
pub enum AuthorityError {
    /// The authority could not be reached within the bounded timeout.
    #[error("license authority unreachable: {0}")]
    Unreachable(String),
    /// The authority answered with something the client cannot interpret.
    #[error("license authority protocol error: {0}")]
    Protocol(String),
}

impl AuthorityError {
    /// Whether this failure is eligible for backoff-and-retry.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Capability interface to the external license authority.
///
/// Every call carries a bounded timeout inside the implementation; the
/// trait itself is transport-agnostic so the admission flow can be tested
/// against the in-memory mock.
#[async_trait]
pub trait LicenseAuthority: Send + Sync + std::fmt::Debug {
    /// Request a seat checkout for the given user and feature.
    async fn checkout(
        &self,
        user_id: UserId,
        feature_name: &str,
    ) -> Result<CheckoutReply, AuthorityError>;

    /// Return a previously issued token. Idempotent on the authority side.
    async fn checkin(&self, token: &ExternalToken) -> Result<(), AuthorityError>;

    /// Report the authority's view of the pool.
    async fn report_state(&self, feature_name: &str) -> Result<ExternalPoolState, AuthorityError>;
}
