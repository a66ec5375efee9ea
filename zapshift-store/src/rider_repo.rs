use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use zapshift_core::repository::RiderRepository;
use zapshift_core::{Rider, RiderFilter, RiderStatus, StoreError, StoreResult, WorkStatus};

use crate::map_sqlx;

pub struct PgRiderRepository {
    pool: PgPool,
}

impl PgRiderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RiderRow {
    id: Uuid,
    name: String,
    email: String,
    district: String,
    status: String,
    work_status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl RiderRow {
    fn into_rider(self) -> StoreResult<Rider> {
        let status = RiderStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("bad rider status token: {}", self.status)))?;
        let work_status = WorkStatus::parse(&self.work_status).ok_or_else(|| {
            StoreError::Backend(format!("bad work status token: {}", self.work_status))
        })?;

        Ok(Rider {
            id: self.id,
            name: self.name,
            email: self.email,
            district: self.district,
            status,
            work_status,
            created_at: self.created_at,
        })
    }
}

const SELECT_RIDER: &str =
    "SELECT id, name, email, district, status, work_status, created_at FROM riders";

#[async_trait]
impl RiderRepository for PgRiderRepository {
    async fn insert(&self, rider: &Rider) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO riders (id, name, email, district, status, work_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(rider.id)
        .bind(&rider.name)
        .bind(&rider.email)
        .bind(&rider.district)
        .bind(rider.status.as_token())
        .bind(rider.work_status.as_token())
        .bind(rider.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Rider>> {
        let row = sqlx::query_as::<_, RiderRow>(&format!("{SELECT_RIDER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(RiderRow::into_rider).transpose()
    }

    async fn list(&self, filter: &RiderFilter) -> StoreResult<Vec<Rider>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_RIDER);
        let mut prefix = " WHERE ";

        if let Some(status) = &filter.status {
            builder.push(prefix).push("status = ").push_bind(status.as_token());
            prefix = " AND ";
        }
        if let Some(district) = &filter.district {
            builder.push(prefix).push("district = ").push_bind(district);
            prefix = " AND ";
        }
        if let Some(work_status) = &filter.work_status {
            builder
                .push(prefix)
                .push("work_status = ")
                .push_bind(work_status.as_token());
        }
        builder.push(" ORDER BY created_at DESC");

        let rows: Vec<RiderRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(RiderRow::into_rider).collect()
    }

    async fn set_work_status(&self, id: Uuid, work_status: WorkStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE riders SET work_status = $1 WHERE id = $2")
            .bind(work_status.as_token())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("rider {id}")));
        }
        Ok(())
    }

    async fn set_approval(&self, id: Uuid, status: RiderStatus) -> StoreResult<Rider> {
        // Approval decisions also reset availability.
        let row = sqlx::query_as::<_, RiderRow>(
            "UPDATE riders SET status = $1, work_status = $2 WHERE id = $3 \
             RETURNING id, name, email, district, status, work_status, created_at",
        )
        .bind(status.as_token())
        .bind(WorkStatus::Available.as_token())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or_else(|| StoreError::NotFound(format!("rider {id}")))?
            .into_rider()
    }
}
