use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use zapshift_core::repository::PaymentRepository;
use zapshift_core::{
    DeliveryStatus, PaymentReceipt, PaymentStatus, SessionPaymentStatus, StoreError, StoreResult,
    TrackingLogEntry,
};

use crate::map_sqlx;
use crate::tracking_repo::append_log_tx;

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    id: Uuid,
    transaction_id: String,
    parcel_id: Uuid,
    parcel_name: String,
    amount: f64,
    currency: String,
    customer_email: String,
    payment_status: String,
    tracking_id: String,
    paid_at: chrono::DateTime<chrono::Utc>,
}

impl ReceiptRow {
    fn into_receipt(self) -> StoreResult<PaymentReceipt> {
        let payment_status = SessionPaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            StoreError::Backend(format!("bad payment status token: {}", self.payment_status))
        })?;

        Ok(PaymentReceipt {
            id: self.id,
            transaction_id: self.transaction_id,
            parcel_id: self.parcel_id,
            parcel_name: self.parcel_name,
            amount: self.amount,
            currency: self.currency,
            customer_email: self.customer_email,
            payment_status,
            tracking_id: self.tracking_id,
            paid_at: self.paid_at,
        })
    }
}

const SELECT_RECEIPT: &str = "SELECT id, transaction_id, parcel_id, parcel_name, amount, \
     currency, customer_email, payment_status, tracking_id, paid_at FROM payments";

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn find_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<PaymentReceipt>> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "{SELECT_RECEIPT} WHERE transaction_id = $1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(ReceiptRow::into_receipt).transpose()
    }

    async fn settle(
        &self,
        parcel_id: Uuid,
        tracking_id: &str,
        receipt: &PaymentReceipt,
        log: &TrackingLogEntry,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let result = sqlx::query(
            "UPDATE parcels SET payment_status = $1, delivery_status = $2, tracking_id = $3 \
             WHERE id = $4",
        )
        .bind(PaymentStatus::Paid.as_token())
        .bind(DeliveryStatus::ParcelPaid.as_token())
        .bind(tracking_id)
        .bind(parcel_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("parcel {parcel_id}")));
        }

        sqlx::query(
            "INSERT INTO payments (id, transaction_id, parcel_id, parcel_name, amount, currency, \
             customer_email, payment_status, tracking_id, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(receipt.id)
        .bind(&receipt.transaction_id)
        .bind(receipt.parcel_id)
        .bind(&receipt.parcel_name)
        .bind(receipt.amount)
        .bind(&receipt.currency)
        .bind(&receipt.customer_email)
        .bind(receipt.payment_status.as_token())
        .bind(&receipt.tracking_id)
        .bind(receipt.paid_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        append_log_tx(&mut tx, log).await?;

        tx.commit().await.map_err(map_sqlx)
    }

    async fn list_by_customer(&self, email: &str) -> StoreResult<Vec<PaymentReceipt>> {
        let rows = sqlx::query_as::<_, ReceiptRow>(&format!(
            "{SELECT_RECEIPT} WHERE customer_email = $1 ORDER BY paid_at DESC"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }
}
