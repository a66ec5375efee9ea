use axum::{
    extract::{Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use zapshift_core::PaymentReceipt;
use zapshift_delivery::{CheckoutDraft, ReconcileOutcome};

use crate::auth::AuthPrincipal;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(payment_history))
        .route("/payments/checkout-session", post(create_checkout_session))
        .route("/payments/success", patch(payment_success))
}

/// POST /payments/checkout-session
async fn create_checkout_session(
    State(state): State<AppState>,
    Json(draft): Json<CheckoutDraft>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state.payments.checkout(draft).await?;
    Ok(Json(json!({ "url": session.url })))
}

#[derive(Debug, Deserialize)]
struct SuccessQuery {
    session_id: String,
}

/// PATCH /payments/success?session_id=
///
/// Hit from both the browser redirect and the gateway webhook, so the same
/// session is routinely delivered more than once.
async fn payment_success(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let outcome = state.payments.reconcile(&query.session_id).await?;

    let body = match outcome {
        ReconcileOutcome::AlreadyProcessed {
            transaction_id,
            tracking_id,
        } => json!({
            "message": "already exist",
            "transaction_id": transaction_id,
            "tracking_id": tracking_id,
        }),
        ReconcileOutcome::NotPaid => json!({ "success": false }),
        ReconcileOutcome::Settled {
            parcel_id,
            tracking_id,
            transaction_id,
            receipt,
        } => json!({
            "success": true,
            "parcel_id": parcel_id,
            "tracking_id": tracking_id,
            "transaction_id": transaction_id,
            "payment_info": receipt,
        }),
    };

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    email: String,
}

/// GET /payments?email= — callers may only read their own history.
async fn payment_history(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PaymentReceipt>>, AppError> {
    if query.email != principal.email {
        return Err(AppError::Forbidden("Forbidden access".to_string()));
    }

    Ok(Json(state.payments.history(&query.email).await?))
}
