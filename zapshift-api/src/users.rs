use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use zapshift_core::repository::UserRepository;
use zapshift_core::{Role, StoreError, User};

use crate::auth::{require_admin, AuthPrincipal};
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}/role", get(get_role).patch(set_role))
}

#[derive(Debug, Deserialize)]
struct CreateUser {
    name: String,
    email: String,
}

/// POST /users — registration is idempotent on email. The store's unique
/// constraint is the authority, so a concurrent registration of the same
/// email still answers `user exists` rather than a conflict error.
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = User::new(body.name, body.email);
    match state.users.insert(&user).await {
        Ok(()) => {}
        Err(StoreError::Conflict(_)) => return Ok(Json(json!({ "message": "user exists" }))),
        Err(err) => return Err(err.into()),
    }

    Ok(Json(serde_json::to_value(user).map_err(|e| AppError::Internal(e.to_string()))?))
}

/// GET /users/{email}/role — unknown accounts default to the plain role.
///
/// Shares the `/users/{id}/role` template with the admin PATCH; the
/// segment here is an email address.
async fn get_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let role = state
        .users
        .find_by_email(&email)
        .await?
        .map(|u| u.role)
        .unwrap_or(Role::User);

    Ok(Json(json!({ "role": role })))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search_text: Option<String>,
}

/// GET /users?search_text= (admin)
async fn list_users(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    require_admin(&state, &principal).await?;
    Ok(Json(state.users.search(query.search_text.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
struct RoleBody {
    role: Role,
}

/// PATCH /users/{id}/role (admin)
async fn set_role(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &principal).await?;
    state.users.set_role(id, body.role).await?;
    Ok(Json(json!({ "modified": true })))
}
