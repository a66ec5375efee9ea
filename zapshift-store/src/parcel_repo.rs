use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use zapshift_core::repository::ParcelRepository;
use zapshift_core::{
    DeliveryStatus, Parcel, ParcelFilter, PaymentStatus, RiderAssignment, StoreError, StoreResult,
    TrackingLogEntry,
};

use crate::map_sqlx;
use crate::tracking_repo::append_log_tx;

pub struct PgParcelRepository {
    pool: PgPool,
}

impl PgParcelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ParcelRow {
    id: Uuid,
    parcel_name: String,
    sender_name: String,
    sender_email: String,
    receiver_name: String,
    receiver_email: String,
    cost: i64,
    tracking_id: String,
    delivery_status: String,
    payment_status: String,
    rider_id: Option<Uuid>,
    rider_name: Option<String>,
    rider_email: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl ParcelRow {
    fn into_parcel(self) -> StoreResult<Parcel> {
        let delivery_status = DeliveryStatus::try_from(self.delivery_status)
            .map_err(StoreError::Backend)?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            StoreError::Backend(format!("bad payment status token: {}", self.payment_status))
        })?;

        Ok(Parcel {
            id: self.id,
            parcel_name: self.parcel_name,
            sender_name: self.sender_name,
            sender_email: self.sender_email,
            receiver_name: self.receiver_name,
            receiver_email: self.receiver_email,
            cost: self.cost,
            tracking_id: self.tracking_id,
            delivery_status,
            payment_status,
            rider_id: self.rider_id,
            rider_name: self.rider_name,
            rider_email: self.rider_email,
            created_at: self.created_at,
        })
    }
}

const SELECT_PARCEL: &str = "SELECT id, parcel_name, sender_name, sender_email, receiver_name, \
     receiver_email, cost, tracking_id, delivery_status, payment_status, rider_id, rider_name, \
     rider_email, created_at FROM parcels";

#[async_trait]
impl ParcelRepository for PgParcelRepository {
    async fn create(&self, parcel: &Parcel, log: &TrackingLogEntry) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query(
            "INSERT INTO parcels (id, parcel_name, sender_name, sender_email, receiver_name, \
             receiver_email, cost, tracking_id, delivery_status, payment_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(parcel.id)
        .bind(&parcel.parcel_name)
        .bind(&parcel.sender_name)
        .bind(&parcel.sender_email)
        .bind(&parcel.receiver_name)
        .bind(&parcel.receiver_email)
        .bind(parcel.cost)
        .bind(&parcel.tracking_id)
        .bind(parcel.delivery_status.as_token())
        .bind(parcel.payment_status.as_token())
        .bind(parcel.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        append_log_tx(&mut tx, log).await?;

        tx.commit().await.map_err(map_sqlx)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Parcel>> {
        let row = sqlx::query_as::<_, ParcelRow>(&format!("{SELECT_PARCEL} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(ParcelRow::into_parcel).transpose()
    }

    async fn assign_rider(
        &self,
        id: Uuid,
        assignment: &RiderAssignment,
        log: &TrackingLogEntry,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let result = sqlx::query(
            "UPDATE parcels SET delivery_status = $1, rider_id = $2, rider_name = $3, \
             rider_email = $4 WHERE id = $5",
        )
        .bind(DeliveryStatus::DriverAssigned.as_token())
        .bind(assignment.rider_id)
        .bind(&assignment.rider_name)
        .bind(&assignment.rider_email)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("parcel {id}")));
        }

        append_log_tx(&mut tx, log).await?;

        tx.commit().await.map_err(map_sqlx)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: &DeliveryStatus,
        log: &TrackingLogEntry,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let result = sqlx::query("UPDATE parcels SET delivery_status = $1 WHERE id = $2")
            .bind(status.as_token())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("parcel {id}")));
        }

        append_log_tx(&mut tx, log).await?;

        tx.commit().await.map_err(map_sqlx)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM parcels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("parcel {id}")));
        }
        Ok(())
    }

    async fn list(&self, filter: &ParcelFilter) -> StoreResult<Vec<Parcel>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_PARCEL);
        let mut first = true;

        if let Some(sender_email) = &filter.sender_email {
            builder.push(" WHERE sender_email = ").push_bind(sender_email);
            first = false;
        }
        if let Some(status) = &filter.delivery_status {
            builder.push(if first { " WHERE " } else { " AND " });
            builder
                .push("delivery_status = ")
                .push_bind(status.as_token().to_string());
        }
        builder.push(" ORDER BY created_at DESC");

        let rows: Vec<ParcelRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(ParcelRow::into_parcel).collect()
    }

    async fn list_for_rider(
        &self,
        rider_email: &str,
        status: Option<&DeliveryStatus>,
    ) -> StoreResult<Vec<Parcel>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_PARCEL);
        builder.push(" WHERE rider_email = ").push_bind(rider_email);

        match status {
            Some(status) => {
                builder
                    .push(" AND delivery_status = ")
                    .push_bind(status.as_token().to_string());
            }
            None => {
                // Active workload view: everything not yet delivered.
                builder
                    .push(" AND delivery_status <> ")
                    .push_bind("parcel_delivered");
            }
        }
        builder.push(" ORDER BY created_at DESC");

        let rows: Vec<ParcelRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.into_iter().map(ParcelRow::into_parcel).collect()
    }
}
