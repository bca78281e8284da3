//! Seat checkout repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use teamdrive_core::error::{AppError, ErrorKind};
use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{CheckoutId, SessionId};
use teamdrive_entity::seat::checkout::SeatCheckout;

/// Repository for seat checkout audit records.
#[derive(Debug, Clone)]
pub struct SeatCheckoutRepository {
    pool: PgPool,
}

impl SeatCheckoutRepository {
    /// Create a new seat checkout repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a checkout record.
    pub async fn create(&self, checkout: &SeatCheckout) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO seat_checkouts (id, session_id, user_id, feature_name, external_token, \
             checked_out_at, checked_in_at, ip_address, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(checkout.id)
        .bind(checkout.session_id)
        .bind(checkout.user_id)
        .bind(&checkout.feature_name)
        .bind(&checkout.external_token)
        .bind(checkout.checked_out_at)
        .bind(checkout.checked_in_at)
        .bind(checkout.ip_address)
        .bind(checkout.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create checkout", e))?;
        Ok(())
    }

    /// Find a checkout by ID.
    pub async fn find_by_id(&self, id: CheckoutId) -> AppResult<Option<SeatCheckout>> {
        sqlx::query_as::<_, SeatCheckout>("SELECT * FROM seat_checkouts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find checkout", e))
    }

    /// Find all active checkouts.
    pub async fn find_all_active(&self) -> AppResult<Vec<SeatCheckout>> {
        sqlx::query_as::<_, SeatCheckout>("SELECT * FROM seat_checkouts WHERE is_active = TRUE")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find active checkouts", e)
            })
    }

    /// Find active checkouts for a session.
    pub async fn find_active_by_session(
        &self,
        session_id: SessionId,
    ) -> AppResult<Vec<SeatCheckout>> {
        sqlx::query_as::<_, SeatCheckout>(
            "SELECT * FROM seat_checkouts WHERE session_id = $1 AND is_active = TRUE",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find session checkouts", e)
        })
    }

    /// Count all active checkouts.
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM seat_checkouts WHERE is_active = TRUE")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to count active checkouts",
                        e,
                    )
                })?;
        Ok(count)
    }

    /// Count active checkouts whose session reference has been cleared.
    pub async fn count_orphaned(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM seat_checkouts WHERE is_active = TRUE AND session_id IS NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to count orphaned checkouts",
                e,
            )
        })?;
        Ok(count)
    }

    /// Check in a seat (set is_active = false). Returns the number of rows
    /// affected: `0` means the checkout was already checked in.
    pub async fn checkin(&self, checkout_id: CheckoutId, at: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE seat_checkouts SET is_active = FALSE, checked_in_at = $2 \
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(checkout_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to checkin seat", e))?;
        Ok(result.rows_affected())
    }
}
