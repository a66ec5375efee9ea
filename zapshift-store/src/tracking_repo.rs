use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use zapshift_core::repository::TrackingLogRepository;
use zapshift_core::{StoreError, StoreResult, TrackingLogEntry};

use crate::map_sqlx;

/// Append a tracking-log row inside a caller-owned transaction. Entries with
/// an empty tracking id are skipped: legacy parcels without a code keep their
/// primary write, the audit row is simply not produced.
pub(crate) async fn append_log_tx(
    tx: &mut Transaction<'_, Postgres>,
    entry: &TrackingLogEntry,
) -> StoreResult<()> {
    if entry.tracking_id.is_empty() {
        tracing::warn!(status = %entry.status, "skipping tracking log append without tracking id");
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO tracking_logs (id, tracking_id, status, details, created_at) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(entry.id)
    .bind(&entry.tracking_id)
    .bind(&entry.status)
    .bind(&entry.details)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

pub struct PgTrackingLogRepository {
    pool: PgPool,
}

impl PgTrackingLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: uuid::Uuid,
    tracking_id: String,
    status: String,
    details: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
impl TrackingLogRepository for PgTrackingLogRepository {
    async fn append(&self, entry: &TrackingLogEntry) -> StoreResult<()> {
        if entry.tracking_id.is_empty() {
            return Err(StoreError::NotFound("empty tracking id".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        append_log_tx(&mut tx, entry).await?;
        tx.commit().await.map_err(map_sqlx)
    }

    async fn list_by_tracking_id(&self, tracking_id: &str) -> StoreResult<Vec<TrackingLogEntry>> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT id, tracking_id, status, details, created_at FROM tracking_logs \
             WHERE tracking_id = $1 ORDER BY created_at ASC",
        )
        .bind(tracking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|row| TrackingLogEntry {
                id: row.id,
                tracking_id: row.tracking_id,
                status: row.status,
                details: row.details,
                created_at: row.created_at,
            })
            .collect())
    }
}
