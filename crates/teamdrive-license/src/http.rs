//! HTTP implementation of the license authority client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use teamdrive_core::config::license::LicenseConfig;
use teamdrive_core::error::AppError;
use teamdrive_core::types::id::UserId;

use crate::authority::{
    AuthorityError, CheckoutReply, ExternalPoolState, ExternalToken, LicenseAuthority,
};

/// HTTP client for the external license authority's JSON API.
///
/// Every request is bounded by `request_timeout_ms` from configuration;
/// connect failures and timeouts surface as [`AuthorityError::Unreachable`].
#[derive(Debug, Clone)]
pub struct HttpLicenseAuthority {
    /// Shared reqwest client with the configured timeout.
    client: reqwest::Client,
    /// Base URL of the authority, without a trailing slash.
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    user_id: UserId,
    feature: &'a str,
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct DenialResponse {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckinRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct PoolStateResponse {
    total_seats: u32,
    checked_out: u32,
}

impl HttpLicenseAuthority {
    /// Create a new HTTP authority client from configuration.
    pub fn new(config: &LicenseConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.authority_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn transport_error(err: reqwest::Error) -> AuthorityError {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            AuthorityError::Unreachable(err.to_string())
        } else {
            AuthorityError::Protocol(err.to_string())
        }
    }
}

#[async_trait]
impl LicenseAuthority for HttpLicenseAuthority {
    async fn checkout(
        &self,
        user_id: UserId,
        feature_name: &str,
    ) -> Result<CheckoutReply, AuthorityError> {
        debug!(user_id = %user_id, feature = %feature_name, "Requesting checkout from authority");

        let response = self
            .client
            .post(self.endpoint("/v1/checkout"))
            .json(&CheckoutRequest {
                user_id,
                feature: feature_name,
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if status.is_success() {
            let body: CheckoutResponse = response
                .json()
                .await
                .map_err(|e| AuthorityError::Protocol(format!("Bad checkout body: {e}")))?;
            return Ok(CheckoutReply::Granted(ExternalToken(body.token)));
        }

        if status == reqwest::StatusCode::CONFLICT || status == reqwest::StatusCode::FORBIDDEN {
            let body: DenialResponse = response.json().await.unwrap_or(DenialResponse {
                reason: None,
            });
            return Ok(CheckoutReply::Denied {
                reason: body
                    .reason
                    .unwrap_or_else(|| "checkout denied by authority".to_string()),
            });
        }

        Err(AuthorityError::Protocol(format!(
            "Unexpected checkout status: {status}"
        )))
    }

    async fn checkin(&self, token: &ExternalToken) -> Result<(), AuthorityError> {
        debug!(token = %token, "Checking token in with authority");

        let response = self
            .client
            .post(self.endpoint("/v1/checkin"))
            .json(&CheckinRequest {
                token: token.as_str(),
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        // An unknown token means the check-in already happened; the
        // authority is idempotent keyed by token.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(AuthorityError::Protocol(format!(
            "Unexpected checkin status: {status}"
        )))
    }

    async fn report_state(&self, feature_name: &str) -> Result<ExternalPoolState, AuthorityError> {
        let response = self
            .client
            .get(self.endpoint("/v1/pool"))
            .query(&[("feature", feature_name)])
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthorityError::Protocol(format!(
                "Unexpected pool status: {status}"
            )));
        }

        let body: PoolStateResponse = response
            .json()
            .await
            .map_err(|e| AuthorityError::Protocol(format!("Bad pool body: {e}")))?;

        Ok(ExternalPoolState {
            feature_name: feature_name.to_string(),
            total_seats: body.total_seats,
            checked_out: body.checked_out,
            reported_at: Utc::now(),
            source: self.base_url.clone(),
        })
    }
}
