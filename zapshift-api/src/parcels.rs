use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use zapshift_core::parcel::ParcelDraft;
use zapshift_core::tracking::TrackingLogEntry;
use zapshift_core::{DeliveryStatus, Parcel, ParcelFilter, Rider, RiderAssignment};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/parcels", get(list_parcels).post(create_parcel))
        .route("/parcels/{id}", get(get_parcel).delete(delete_parcel))
        .route("/parcels/{id}/assign", patch(assign_rider))
        .route("/parcels/{id}/status", patch(set_status))
        .route("/rider-parcels", get(rider_parcels))
        .route("/tracking/{tracking_id}/logs", get(tracking_logs))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    email: Option<String>,
    delivery_status: Option<DeliveryStatus>,
}

/// GET /parcels?email=&delivery_status=
async fn list_parcels(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let filter = ParcelFilter {
        sender_email: query.email,
        delivery_status: query.delivery_status,
    };
    Ok(Json(state.lifecycle.list(&filter).await?))
}

/// GET /parcels/{id}
async fn get_parcel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    Ok(Json(state.lifecycle.get(id).await?))
}

/// POST /parcels
async fn create_parcel(
    State(state): State<AppState>,
    Json(draft): Json<ParcelDraft>,
) -> Result<(StatusCode, Json<Parcel>), AppError> {
    let parcel = state.lifecycle.create(draft).await?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

/// PATCH /parcels/{id}/assign
async fn assign_rider(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(assignment): Json<RiderAssignment>,
) -> Result<Json<Rider>, AppError> {
    Ok(Json(state.lifecycle.assign_rider(id, assignment).await?))
}

#[derive(Debug, Deserialize)]
struct SetStatusBody {
    delivery_status: DeliveryStatus,
    rider_id: Option<Uuid>,
}

/// PATCH /parcels/{id}/status
async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<Parcel>, AppError> {
    state
        .lifecycle
        .set_status(id, body.delivery_status, body.rider_id)
        .await?;
    Ok(Json(state.lifecycle.get(id).await?))
}

/// DELETE /parcels/{id}
async fn delete_parcel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.lifecycle.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RiderParcelsQuery {
    email: String,
    delivery_status: Option<DeliveryStatus>,
}

/// GET /rider-parcels?email=&delivery_status=
///
/// Default view is the rider's active workload; asking for
/// `parcel_delivered` explicitly switches to the delivered-only view.
async fn rider_parcels(
    State(state): State<AppState>,
    Query(query): Query<RiderParcelsQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let parcels = state
        .lifecycle
        .list_for_rider(&query.email, query.delivery_status.as_ref())
        .await?;
    Ok(Json(parcels))
}

/// GET /tracking/{tracking_id}/logs
async fn tracking_logs(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Vec<TrackingLogEntry>>, AppError> {
    Ok(Json(state.lifecycle.track(&tracking_id).await?))
}
