use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use zapshift_core::rider::RiderDraft;
use zapshift_core::{Rider, RiderFilter, RiderStatus};

use crate::auth::{require_admin, AuthPrincipal};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/riders", get(list_riders).post(register_rider))
        .route("/riders/{id}", patch(set_approval))
}

/// GET /riders?status=&district=&work_status=
async fn list_riders(
    State(state): State<AppState>,
    Query(filter): Query<RiderFilter>,
) -> Result<Json<Vec<Rider>>, AppError> {
    Ok(Json(state.riders.list(&filter).await?))
}

/// POST /riders — applications come in as pending.
async fn register_rider(
    State(state): State<AppState>,
    Json(draft): Json<RiderDraft>,
) -> Result<(StatusCode, Json<Rider>), AppError> {
    let rider = state.riders.register(draft).await?;
    Ok((StatusCode::CREATED, Json(rider)))
}

#[derive(Debug, Deserialize)]
struct ApprovalBody {
    status: RiderStatus,
}

/// PATCH /riders/{id} (admin) — approve or reject an application.
async fn set_approval(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<ApprovalBody>,
) -> Result<Json<Rider>, AppError> {
    require_admin(&state, &principal).await?;
    Ok(Json(state.riders.set_approval(id, body.status).await?))
}
