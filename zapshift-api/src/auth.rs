use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use zapshift_core::identity::{IdentityError, IdentityVerifier, Principal};
use zapshift_core::repository::UserRepository;
use zapshift_core::Role;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor for handlers that require a verified caller. Rejects the
/// request with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("unauthorized access".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("unauthorized access".to_string()))?;

        let principal = state.verifier.verify(token).await?;
        Ok(AuthPrincipal(principal))
    }
}

/// Admin gate: the verified principal must resolve to a user record with the
/// admin role. The role lives in the store, not in the credential.
pub async fn require_admin(state: &AppState, principal: &Principal) -> Result<(), AppError> {
    let user = state.users.find_by_email(&principal.email).await?;

    match user {
        Some(user) if user.role == Role::Admin => Ok(()),
        _ => Err(AppError::Forbidden("forbidden access".to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    email: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Identity verification against tokens minted by the external identity
/// provider, validated locally with a shared HS256 secret.
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, IdentityError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| IdentityError::InvalidToken)?;

        Ok(Principal {
            email: token_data.claims.email,
        })
    }
}
