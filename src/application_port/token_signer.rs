use crate::domain_model::{PrincipalId, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("signing error: {0}")]
    Signing(String),
    #[error("invalid token configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("issuer mismatch")]
    IssuerMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

/// Claims recovered from a token whose signature, issuer and expiry checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Process-wide token settings. Immutable once built.
#[derive(Clone)]
pub struct JwtConfig {
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    signing_key: Vec<u8>,
}

impl JwtConfig {
    pub fn new(
        issuer: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        signing_key: Vec<u8>,
    ) -> Result<Self, SignerError> {
        let issuer = issuer.into();
        if signing_key.is_empty() {
            return Err(SignerError::InvalidConfig("signing key is empty".to_string()));
        }
        if issuer.is_empty() {
            return Err(SignerError::InvalidConfig("issuer is empty".to_string()));
        }
        if access_ttl.as_secs() == 0 {
            return Err(SignerError::InvalidConfig(
                "access ttl must be at least one second".to_string(),
            ));
        }
        if refresh_ttl < access_ttl {
            return Err(SignerError::InvalidConfig(format!(
                "refresh ttl ({}s) is shorter than access ttl ({}s)",
                refresh_ttl.as_secs(),
                access_ttl.as_secs()
            )));
        }
        Ok(Self {
            issuer,
            access_ttl,
            refresh_ttl,
            signing_key,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

pub trait TokenSigner: Send + Sync {
    fn mint(
        &self,
        principal_id: &PrincipalId,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<AccessToken, SignerError>;
    fn verify(&self, token: &str) -> Result<VerifiedClaims, SignerError>;
    fn config(&self) -> &JwtConfig;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn refresh_shorter_than_access_is_rejected() {
        let r = JwtConfig::new("iss", secs(600), secs(599), b"k".to_vec());
        assert!(matches!(r, Err(SignerError::InvalidConfig(_))));
    }

    #[test]
    fn equal_ttls_are_accepted() {
        assert!(JwtConfig::new("iss", secs(600), secs(600), b"k".to_vec()).is_ok());
    }

    #[test]
    fn empty_key_and_issuer_are_rejected() {
        assert!(JwtConfig::new("iss", secs(1), secs(2), Vec::new()).is_err());
        assert!(JwtConfig::new("", secs(1), secs(2), b"k".to_vec()).is_err());
        assert!(JwtConfig::new("iss", secs(0), secs(2), b"k".to_vec()).is_err());
    }

    #[test]
    fn debug_hides_signing_key() {
        let cfg = JwtConfig::new("iss", secs(1), secs(2), b"super-secret".to_vec()).unwrap();
        assert!(!format!("{:?}", cfg).contains("super-secret"));
    }
}
