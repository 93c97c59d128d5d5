use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

/// Issues, renews, rotates and validates credential pairs.
///
/// Holds no mutable state of its own. The session row (`session:<principal>`)
/// and refresh row (`refresh:<token>`) live in the shared store and expire
/// independently, so every read reconciles the two:
///
/// * a refresh row is always written before the session row that points at it,
/// * a consumed refresh row is gone before its replacement is created,
/// * a crash between steps can orphan a refresh row (it self-expires) but never
///   leaves a session row pointing at a refresh row that was not written.
pub struct RealCredentialService {
    signer: Arc<dyn TokenSigner>,
    store: Arc<dyn SessionStore>,
}

impl RealCredentialService {
    pub fn new(signer: Arc<dyn TokenSigner>, store: Arc<dyn SessionStore>) -> Self {
        Self { signer, store }
    }

    #[inline]
    fn new_refresh_token() -> String {
        Uuid::new_v4().to_string()
    }

    fn access_ttl_secs(&self) -> u64 {
        self.signer.config().access_ttl().as_secs()
    }

    fn refresh_ttl_secs(&self) -> u64 {
        self.signer.config().refresh_ttl().as_secs()
    }

    async fn read_row<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<CacheEntry<T>, CredentialError> {
        let raw = self
            .store
            .get(key)
            .await
            .map_err(|e| CredentialError::StoreRead(e.to_string()))?;
        match raw {
            CacheEntry::Found(json) => serde_json::from_str(&json)
                .map(CacheEntry::Found)
                .map_err(|_| CredentialError::CorruptSession),
            CacheEntry::Absent => Ok(CacheEntry::Absent),
        }
    }

    async fn write_row<T: Serialize>(
        &self,
        key: &str,
        row: &T,
        ttl_secs: u64,
    ) -> Result<(), CredentialError> {
        let json =
            serde_json::to_string(row).map_err(|e| CredentialError::StoreWrite(e.to_string()))?;
        self.store
            .set(key, &json, ttl_secs)
            .await
            .map_err(|e| CredentialError::StoreWrite(e.to_string()))
    }

    async fn delete_key(&self, key: &str) -> Result<(), CredentialError> {
        self.store
            .delete(key)
            .await
            .map_err(|e| CredentialError::StoreWrite(e.to_string()))
    }

    fn mint(&self, principal_id: &PrincipalId, role: Role) -> Result<AccessToken, CredentialError> {
        self.signer
            .mint(principal_id, role, Utc::now())
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    /// Replace an expired access token while keeping the refresh token.
    async fn renew(
        &self,
        principal_id: &PrincipalId,
        role: Role,
        stale: SessionRow,
    ) -> Result<Credentials, CredentialError> {
        // The refresh token handed back must still resolve to this principal.
        let refresh_row = self
            .read_row::<RefreshRow>(&refresh_key(&stale.refresh_token))
            .await;
        match refresh_row {
            Ok(CacheEntry::Found(row)) if row.principal_id == *principal_id => {}
            Ok(_) | Err(CredentialError::CorruptSession) => {
                info!(%principal_id, "refresh row missing during renewal, issuing new pair");
                return self.create_credentials(principal_id, role).await;
            }
            Err(e) => return Err(e),
        }

        self.delete_key(&session_key(principal_id)).await?;

        let access_token = self.mint(principal_id, role)?;
        let row = SessionRow {
            access_token: access_token.0.clone(),
            role,
            refresh_token: stale.refresh_token,
        };
        self.write_row(&session_key(principal_id), &row, self.access_ttl_secs())
            .await?;

        debug!(%principal_id, "access token renewed");
        Ok(Credentials {
            access_token,
            refresh_token: RefreshToken(row.refresh_token),
            expires_in: self.access_ttl_secs(),
        })
    }
}

#[async_trait::async_trait]
impl CredentialService for RealCredentialService {
    async fn get_credentials(
        &self,
        principal_id: &PrincipalId,
        role: Role,
    ) -> Result<Credentials, CredentialError> {
        let row = match self.read_row::<SessionRow>(&session_key(principal_id)).await? {
            CacheEntry::Found(row) => row,
            CacheEntry::Absent => {
                info!(%principal_id, "no session found, issuing credentials");
                return self.create_credentials(principal_id, role).await;
            }
        };

        match self.signer.verify(&row.access_token) {
            Ok(claims) if claims.principal_id == *principal_id => {
                let remaining = (claims.expires_at - Utc::now()).num_seconds().max(0) as u64;
                Ok(Credentials {
                    access_token: AccessToken(row.access_token),
                    refresh_token: RefreshToken(row.refresh_token),
                    expires_in: remaining,
                })
            }
            Ok(_) => {
                warn!(%principal_id, "session holds a token for another principal");
                Err(CredentialError::CorruptSession)
            }
            Err(SignerError::Expired) => self.renew(principal_id, role, row).await,
            Err(e) => {
                warn!(%principal_id, reason = %e, "session token failed verification");
                Err(CredentialError::CorruptSession)
            }
        }
    }

    async fn create_credentials(
        &self,
        principal_id: &PrincipalId,
        role: Role,
    ) -> Result<Credentials, CredentialError> {
        let access_token = self.mint(principal_id, role)?;
        let refresh_token = Self::new_refresh_token();

        let refresh_row = RefreshRow {
            principal_id: principal_id.clone(),
            role,
        };
        self.write_row(
            &refresh_key(&refresh_token),
            &refresh_row,
            self.refresh_ttl_secs(),
        )
        .await?;

        let session_row = SessionRow {
            access_token: access_token.0.clone(),
            role,
            refresh_token: refresh_token.clone(),
        };
        if let Err(e) = self
            .write_row(
                &session_key(principal_id),
                &session_row,
                self.access_ttl_secs(),
            )
            .await
        {
            error!(%principal_id, error = %e, "failed to write session row");
            if let Err(cleanup) = self.store.delete(&refresh_key(&refresh_token)).await {
                warn!(%principal_id, error = %cleanup, "orphaned refresh row left to expire");
            }
            return Err(e);
        }

        debug!(%principal_id, %role, "credentials issued");
        Ok(Credentials {
            access_token,
            refresh_token: RefreshToken(refresh_token),
            expires_in: self.access_ttl_secs(),
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<Credentials, CredentialError> {
        if refresh_token.is_empty() {
            return Err(CredentialError::RefreshTokenNotFound);
        }

        // Lookup and consumption in one step: of concurrent callers holding the
        // same token, at most one gets the row.
        let raw = self
            .store
            .take(&refresh_key(refresh_token))
            .await
            .map_err(|e| CredentialError::StoreRead(e.to_string()))?;
        let row: RefreshRow = match raw {
            CacheEntry::Found(json) => {
                serde_json::from_str(&json).map_err(|_| CredentialError::CorruptSession)?
            }
            CacheEntry::Absent => {
                info!("refresh token not found");
                return Err(CredentialError::RefreshTokenNotFound);
            }
        };
        let principal_id = &row.principal_id;

        // Revokes the previous access token even if it has not expired yet.
        self.delete_key(&session_key(principal_id)).await?;

        match self.create_credentials(principal_id, row.role).await {
            Ok(credentials) => {
                debug!(%principal_id, "credentials rotated");
                Ok(credentials)
            }
            Err(e) => {
                error!(
                    %principal_id,
                    error = %e,
                    "rotation failed after consuming refresh token, principal is signed out"
                );
                Err(e)
            }
        }
    }

    async fn validate_token(&self, token: &str) -> Result<ValidatedPrincipal, CredentialError> {
        let claims = self.signer.verify(token).map_err(|e| {
            debug!(reason = %e, "access token rejected");
            CredentialError::Unauthenticated
        })?;

        let row = match self
            .read_row::<SessionRow>(&session_key(&claims.principal_id))
            .await
        {
            Ok(CacheEntry::Found(row)) => row,
            Ok(CacheEntry::Absent) | Err(CredentialError::CorruptSession) => {
                return Err(CredentialError::Unauthenticated);
            }
            Err(e) => return Err(e),
        };

        // Cryptographically valid but superseded by renewal or rotation.
        if row.access_token != token {
            debug!(principal_id = %claims.principal_id, "access token superseded");
            return Err(CredentialError::Unauthenticated);
        }

        Ok(ValidatedPrincipal {
            principal_id: claims.principal_id,
            role: claims.role,
        })
    }

    async fn sign_out(&self, principal_id: &PrincipalId) -> Result<(), CredentialError> {
        let refresh_token = match self.read_row::<SessionRow>(&session_key(principal_id)).await {
            Ok(CacheEntry::Found(row)) => Some(row.refresh_token),
            Ok(CacheEntry::Absent) | Err(CredentialError::CorruptSession) => None,
            Err(e) => return Err(e),
        };

        self.delete_key(&session_key(principal_id)).await?;
        if let Some(refresh_token) = refresh_token {
            self.delete_key(&refresh_key(&refresh_token)).await?;
        }

        info!(%principal_id, "signed out");
        Ok(())
    }

    fn config(&self) -> &JwtConfig {
        self.signer.config()
    }
}
