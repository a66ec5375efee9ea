use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use zapshift_core::identity::IdentityError;
use zapshift_core::payment::GatewayError;
use zapshift_core::StoreError;
use zapshift_delivery::{LifecycleError, PaymentError};

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Upstream(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Auth failures keep the legacy `{message}` body shape; everything
        // else answers the structured error envelope.
        let (status, kind, message) = match self {
            AppError::Unauthorized(msg) => {
                return (StatusCode::UNAUTHORIZED, Json(json!({ "message": msg }))).into_response();
            }
            AppError::Forbidden(msg) => {
                return (StatusCode::FORBIDDEN, Json(json!({ "message": msg }))).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "upstream", msg)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error_kind": kind,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::IllegalTransition(e) => AppError::BadRequest(e.to_string()),
            LifecycleError::Generation(e) => AppError::Internal(e.to_string()),
            LifecycleError::Store(e) => e.into(),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Gateway(GatewayError::SessionNotFound(id)) => {
                AppError::NotFound(format!("checkout session {id}"))
            }
            PaymentError::Gateway(GatewayError::Upstream(msg)) => AppError::Upstream(msg),
            PaymentError::Generation(e) => AppError::Internal(e.to_string()),
            PaymentError::Store(e) => e.into(),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(_: IdentityError) -> Self {
        AppError::Unauthorized("unauthorized access".to_string())
    }
}
