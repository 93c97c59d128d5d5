use crate::application_port::{AccessToken, JwtConfig, RefreshToken};
use crate::domain_model::{PrincipalId, Role};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("signing error: {0}")]
    Signing(String),
    #[error("session does not belong to a recognized token")]
    CorruptSession,
    #[error("refresh token not found")]
    RefreshTokenNotFound,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("store read error: {0}")]
    StoreRead(String),
    #[error("store write error: {0}")]
    StoreWrite(String),
}

/// Access/refresh pair handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedPrincipal {
    pub principal_id: PrincipalId,
    pub role: Role,
}

#[async_trait::async_trait]
pub trait CredentialService: Send + Sync {
    /// Return the live pair for the principal, renewing an expired access
    /// token in place or issuing a fresh pair when there is no session.
    async fn get_credentials(
        &self,
        principal_id: &PrincipalId,
        role: Role,
    ) -> Result<Credentials, CredentialError>;
    /// Unconditionally issue a new pair, superseding any existing session.
    async fn create_credentials(
        &self,
        principal_id: &PrincipalId,
        role: Role,
    ) -> Result<Credentials, CredentialError>;
    /// Consume a refresh token and rotate both tokens.
    async fn refresh_token(&self, refresh_token: &str) -> Result<Credentials, CredentialError>;
    async fn validate_token(&self, token: &str) -> Result<ValidatedPrincipal, CredentialError>;
    async fn sign_out(&self, principal_id: &PrincipalId) -> Result<(), CredentialError>;
    fn config(&self) -> &JwtConfig;
}
