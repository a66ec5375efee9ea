use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment state the gateway reports for a checkout session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

impl SessionPaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, SessionPaymentStatus::Paid)
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            SessionPaymentStatus::Paid => "paid",
            SessionPaymentStatus::Unpaid => "unpaid",
            SessionPaymentStatus::NoPaymentRequired => "no_payment_required",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "paid" => Some(SessionPaymentStatus::Paid),
            "unpaid" => Some(SessionPaymentStatus::Unpaid),
            "no_payment_required" => Some(SessionPaymentStatus::NoPaymentRequired),
            _ => None,
        }
    }
}

/// Immutable record of a settled gateway payment. `transaction_id` is the
/// idempotency key: at most one receipt exists per gateway transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub id: Uuid,
    pub transaction_id: String,
    pub parcel_id: Uuid,
    pub parcel_name: String,
    /// Settled amount in major currency units.
    pub amount: f64,
    pub currency: String,
    pub customer_email: String,
    pub payment_status: SessionPaymentStatus,
    pub tracking_id: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub parcel_id: Uuid,
    pub parcel_name: String,
    /// Charge amount in minor currency units.
    pub amount_minor: i64,
    pub currency: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted checkout page handed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Settled session state retrieved back from the gateway, metadata resolved.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub payment_intent: String,
    pub payment_status: SessionPaymentStatus,
    pub amount_total: i64,
    pub currency: String,
    pub customer_email: String,
    pub parcel_id: Uuid,
    pub parcel_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unknown checkout session: {0}")]
    SessionNotFound(String),
    #[error("payment gateway failure: {0}")]
    Upstream(String),
}

/// Seam to the external payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session for a parcel.
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError>;

    /// Retrieve the settled state of a session after redirect or webhook.
    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError>;
}
