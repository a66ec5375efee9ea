use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use zapshift_core::repository::{ParcelRepository, PaymentRepository};
use zapshift_core::tracking::GenerationError;
use zapshift_core::{
    generate_tracking_id, CheckoutRequest, CheckoutSession, DeliveryStatus, GatewayError,
    GatewaySession, PaymentGateway, PaymentReceipt, SessionPaymentStatus, StoreError,
    TrackingLogEntry,
};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Checkout wiring pulled from configuration.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub site_domain: String,
    pub currency: String,
}

/// What the client posts to open a checkout session.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CheckoutDraft {
    pub parcel_id: Uuid,
    pub parcel_name: String,
    /// Charge amount in minor currency units.
    pub cost: i64,
    pub sender_email: String,
}

/// Result of applying a gateway session exactly once.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The transaction was settled by an earlier call; nothing was mutated.
    AlreadyProcessed {
        transaction_id: String,
        tracking_id: String,
    },
    /// The gateway does not report the session as paid; nothing was mutated.
    NotPaid,
    Settled {
        parcel_id: Uuid,
        tracking_id: String,
        transaction_id: String,
        receipt: PaymentReceipt,
    },
}

/// Confirms gateway session results and applies their effects exactly once.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    payments: Arc<dyn PaymentRepository>,
    parcels: Arc<dyn ParcelRepository>,
    settings: CheckoutSettings,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        payments: Arc<dyn PaymentRepository>,
        parcels: Arc<dyn ParcelRepository>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            gateway,
            payments,
            parcels,
            settings,
        }
    }

    /// Open a hosted checkout session for a parcel's delivery cost.
    pub async fn checkout(&self, draft: CheckoutDraft) -> Result<CheckoutSession, PaymentError> {
        let request = CheckoutRequest {
            parcel_id: draft.parcel_id,
            parcel_name: draft.parcel_name,
            amount_minor: draft.cost,
            currency: self.settings.currency.clone(),
            customer_email: draft.sender_email,
            success_url: format!(
                "{}/dashboard/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
                self.settings.site_domain
            ),
            cancel_url: format!("{}/dashboard/payment-cancelled", self.settings.site_domain),
        };

        let session = self.gateway.create_session(&request).await?;
        tracing::info!(parcel_id = %request.parcel_id, session_id = %session.id, "checkout session created");
        Ok(session)
    }

    /// Retrieve a session from the gateway and settle it, idempotently.
    pub async fn reconcile(&self, session_id: &str) -> Result<ReconcileOutcome, PaymentError> {
        let session = self.gateway.retrieve_session(session_id).await?;

        // Webhook and browser-redirect delivery both land here; the receipt's
        // transaction id is the dedup key.
        if let Some(existing) = self
            .payments
            .find_by_transaction(&session.payment_intent)
            .await?
        {
            tracing::info!(transaction_id = %existing.transaction_id, "payment already reconciled");
            return Ok(ReconcileOutcome::AlreadyProcessed {
                transaction_id: existing.transaction_id,
                tracking_id: existing.tracking_id,
            });
        }

        if !session.payment_status.is_paid() {
            return Ok(ReconcileOutcome::NotPaid);
        }

        let parcel = self
            .parcels
            .get(session.parcel_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("parcel {}", session.parcel_id)))?;

        // Parcels normally carry a tracking id from creation; minting one
        // here covers records that predate tracking codes.
        let tracking_id = if parcel.tracking_id.is_empty() {
            generate_tracking_id()?
        } else {
            parcel.tracking_id.clone()
        };

        let receipt = PaymentReceipt {
            id: Uuid::new_v4(),
            transaction_id: session.payment_intent.clone(),
            parcel_id: parcel.id,
            parcel_name: session.parcel_name.clone(),
            amount: session.amount_total as f64 / 100.0,
            currency: session.currency.clone(),
            customer_email: session.customer_email.clone(),
            payment_status: session.payment_status,
            tracking_id: tracking_id.clone(),
            paid_at: chrono::Utc::now(),
        };
        let log = TrackingLogEntry::new(&tracking_id, &DeliveryStatus::PendingPickup);

        match self.payments.settle(parcel.id, &tracking_id, &receipt, &log).await {
            Ok(()) => {}
            // Lost a race against a concurrent reconcile of the same session.
            Err(StoreError::Conflict(_)) => {
                if let Some(existing) = self
                    .payments
                    .find_by_transaction(&session.payment_intent)
                    .await?
                {
                    return Ok(ReconcileOutcome::AlreadyProcessed {
                        transaction_id: existing.transaction_id,
                        tracking_id: existing.tracking_id,
                    });
                }
                return Err(StoreError::Conflict(session.payment_intent).into());
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            parcel_id = %parcel.id,
            transaction_id = %receipt.transaction_id,
            tracking_id = %tracking_id,
            "payment reconciled"
        );

        Ok(ReconcileOutcome::Settled {
            parcel_id: parcel.id,
            tracking_id,
            transaction_id: receipt.transaction_id.clone(),
            receipt,
        })
    }

    /// A customer's settled receipts, most recent first.
    pub async fn history(&self, customer_email: &str) -> Result<Vec<PaymentReceipt>, PaymentError> {
        Ok(self.payments.list_by_customer(customer_email).await?)
    }
}

/// Gateway stand-in for tests and local runs: sessions opened through it are
/// reported straight back as paid.
#[derive(Default)]
pub struct MockPaymentGateway {
    sessions: Mutex<HashMap<String, GatewaySession>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a session with an arbitrary state, e.g. an unpaid one.
    pub fn put_session(&self, session_id: &str, session: GatewaySession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.to_string(), session);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let session_id = format!("cs_mock_{}", Uuid::new_v4().simple());
        let session = GatewaySession {
            payment_intent: format!("pi_mock_{}", Uuid::new_v4().simple()),
            payment_status: SessionPaymentStatus::Paid,
            amount_total: request.amount_minor,
            currency: request.currency.clone(),
            customer_email: request.customer_email.clone(),
            parcel_id: request.parcel_id,
            parcel_name: request.parcel_name.clone(),
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.clone(), session);

        Ok(CheckoutSession {
            url: format!("https://checkout.zapshift.test/c/{session_id}"),
            id: session_id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<GatewaySession, GatewayError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))
    }
}
