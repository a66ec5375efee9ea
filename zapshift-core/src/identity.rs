use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verified caller identity threaded explicitly through operations that need
/// authorization, never read from ambient request state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid or expired credential")]
    InvalidToken,
    #[error("identity provider failure: {0}")]
    Upstream(String),
}

/// Seam to the external identity provider: turns a bearer credential into a
/// verified principal email.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, IdentityError>;
}

/// Accepts credentials of the form `test:<email>`. Test/dev stand-in for the
/// real provider.
pub struct MockIdentityVerifier;

#[async_trait]
impl IdentityVerifier for MockIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, IdentityError> {
        let email = token.strip_prefix("test:").ok_or(IdentityError::InvalidToken)?;
        if email.is_empty() {
            return Err(IdentityError::InvalidToken);
        }
        Ok(Principal {
            email: email.to_string(),
        })
    }
}
