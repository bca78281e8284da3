//! Pool snapshot repository implementation.

use sqlx::PgPool;

use teamdrive_core::error::{AppError, ErrorKind};
use teamdrive_core::result::AppResult;
use teamdrive_entity::seat::pool::PoolSnapshot;

/// Repository for seat pool snapshots.
#[derive(Debug, Clone)]
pub struct PoolSnapshotRepository {
    pool: PgPool,
}

impl PoolSnapshotRepository {
    /// Create a new pool snapshot repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a snapshot row.
    pub async fn create(&self, snapshot: &PoolSnapshot) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO pool_snapshots (id, total_seats, checked_out, available, admin_reserved, \
             active_sessions, drift_detected, drift_detail, source, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(snapshot.id)
        .bind(snapshot.total_seats)
        .bind(snapshot.checked_out)
        .bind(snapshot.available)
        .bind(snapshot.admin_reserved)
        .bind(snapshot.active_sessions)
        .bind(snapshot.drift_detected)
        .bind(&snapshot.drift_detail)
        .bind(&snapshot.source)
        .bind(snapshot.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create snapshot", e))?;
        Ok(())
    }

    /// Find the latest snapshot.
    pub async fn find_latest(&self) -> AppResult<Option<PoolSnapshot>> {
        sqlx::query_as::<_, PoolSnapshot>(
            "SELECT * FROM pool_snapshots ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find latest snapshot", e)
        })
    }

    /// List recent snapshots, newest first.
    pub async fn find_recent(&self, limit: i64) -> AppResult<Vec<PoolSnapshot>> {
        sqlx::query_as::<_, PoolSnapshot>(
            "SELECT * FROM pool_snapshots ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list snapshots", e))
    }

    /// Clean up snapshots older than the retention cutoff.
    pub async fn cleanup_old(&self, before: chrono::DateTime<chrono::Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM pool_snapshots WHERE created_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to cleanup snapshots", e)
            })?;
        Ok(result.rows_affected())
    }
}
