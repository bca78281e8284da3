//! Session repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use teamdrive_core::error::{AppError, ErrorKind};
use teamdrive_core::result::AppResult;
use teamdrive_core::types::id::{CheckoutId, SessionId, UserId};
use teamdrive_entity::presence::PresenceStatus;
use teamdrive_entity::session::model::Session;

/// Repository for session CRUD and query operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a fully constructed session row.
    pub async fn create(&self, session: &Session) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, refresh_token_hash, ip_address, \
             user_agent, device_info, priority, checkout_id, seat_allocated_at, overflow_kicked, \
             presence_status, ws_connected, ws_connected_at, created_at, expires_at, last_activity) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token_hash)
        .bind(&session.refresh_token_hash)
        .bind(session.ip_address)
        .bind(&session.user_agent)
        .bind(&session.device_info)
        .bind(session.priority)
        .bind(session.checkout_id)
        .bind(session.seat_allocated_at)
        .bind(session.overflow_kicked)
        .bind(session.presence_status)
        .bind(session.ws_connected)
        .bind(session.ws_connected_at)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.last_activity)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create session", e))?;
        Ok(())
    }

    /// Find a session by ID.
    pub async fn find_by_id(&self, id: SessionId) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    /// List all active sessions for a user.
    pub async fn find_active_by_user(&self, user_id: UserId) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 AND terminated_at IS NULL AND expires_at > NOW() \
             ORDER BY created_at DESC"
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find active sessions", e))
    }

    /// Count active sessions for a user.
    pub async fn count_active_by_user(&self, user_id: UserId) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND terminated_at IS NULL AND expires_at > NOW()"
        )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count active sessions", e))?;
        Ok(count)
    }

    /// Count all active sessions system-wide.
    pub async fn count_all_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE terminated_at IS NULL AND expires_at > NOW()",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to count all active sessions",
                e,
            )
        })?;
        Ok(count)
    }

    /// List all active sessions (admin view).
    pub async fn find_all_active(&self) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE terminated_at IS NULL AND expires_at > NOW() \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list active sessions", e)
        })
    }

    /// List live general-priority sessions eligible for overflow eviction,
    /// oldest activity first.
    pub async fn find_evictable(&self) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE terminated_at IS NULL AND expires_at > NOW() \
             AND priority = 'general' \
             ORDER BY last_activity ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find evictable sessions", e)
        })
    }

    /// Update last activity timestamp.
    pub async fn update_last_activity(
        &self,
        session_id: SessionId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET last_activity = $2 WHERE id = $1")
            .bind(session_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update last activity", e)
            })?;
        Ok(())
    }

    /// Set presence status.
    pub async fn set_presence_status(
        &self,
        session_id: SessionId,
        status: PresenceStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET presence_status = $2 WHERE id = $1")
            .bind(session_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update presence", e)
            })?;
        Ok(())
    }

    /// Set realtime connection state.
    pub async fn set_ws_connected(
        &self,
        session_id: SessionId,
        connected: bool,
        connected_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        if connected {
            sqlx::query(
                "UPDATE sessions SET ws_connected = TRUE, ws_connected_at = $2 WHERE id = $1",
            )
            .bind(session_id)
            .bind(connected_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update WS state", e)
            })?;
        } else {
            sqlx::query("UPDATE sessions SET ws_connected = FALSE WHERE id = $1")
                .bind(session_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to update WS state", e)
                })?;
        }
        Ok(())
    }

    /// Terminate a session. Returns the number of rows affected: `0` means
    /// the session was already terminated (benign for duplicate triggers).
    pub async fn terminate(
        &self,
        session_id: SessionId,
        terminated_by: Option<UserId>,
        reason: &str,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET terminated_by = $2, terminated_reason = $3, terminated_at = $4 \
             WHERE id = $1 AND terminated_at IS NULL",
        )
        .bind(session_id)
        .bind(terminated_by)
        .bind(reason)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to terminate session", e)
        })?;

        Ok(result.rows_affected())
    }

    /// Find expired or idle sessions for the cleanup sweep.
    pub async fn find_expired_or_idle(
        &self,
        now: DateTime<Utc>,
        idle_cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE terminated_at IS NULL \
             AND (expires_at <= $1 OR last_activity < $2)",
        )
        .bind(now)
        .bind(idle_cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find expired sessions", e)
        })
    }

    /// Attach the seat checkout reference after the external confirm.
    pub async fn set_checkout(
        &self,
        session_id: SessionId,
        checkout_id: CheckoutId,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET checkout_id = $2, seat_allocated_at = $3 WHERE id = $1")
            .bind(session_id)
            .bind(checkout_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to set session checkout", e)
            })?;
        Ok(())
    }
}
