use crate::application_port::{AccessToken, JwtConfig, SignerError, TokenSigner, VerifiedClaims};
use crate::domain_model::{PrincipalId, Role};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    iss: String,
    sub: String, // principal id
    role: Role,
    iat: i64,
    exp: i64,
    jti: String, // keeps two tokens minted in the same second distinct
}

pub struct JwtHs256Signer {
    cfg: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Signer {
    pub fn new(cfg: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(cfg.signing_key());
        let decoding_key = DecodingKey::from_secret(cfg.signing_key());

        // Expiry is checked by hand so that a token is dead at exactly `exp`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[cfg.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        JwtHs256Signer {
            cfg,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedClaims, SignerError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    SignerError::InvalidSignature
                }
                ErrorKind::InvalidIssuer => SignerError::IssuerMismatch,
                ErrorKind::ExpiredSignature => SignerError::Expired,
                _ => SignerError::MalformedToken,
            },
        )?;
        let claims = data.claims;

        if now.timestamp() >= claims.exp {
            return Err(SignerError::Expired);
        }

        let principal_id = claims
            .sub
            .parse::<PrincipalId>()
            .map_err(|_| SignerError::MalformedToken)?;
        let issued_at =
            DateTime::from_timestamp(claims.iat, 0).ok_or(SignerError::MalformedToken)?;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(SignerError::MalformedToken)?;

        Ok(VerifiedClaims {
            principal_id,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }
}

impl TokenSigner for JwtHs256Signer {
    fn mint(
        &self,
        principal_id: &PrincipalId,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<AccessToken, SignerError> {
        if self.cfg.signing_key().is_empty() {
            return Err(SignerError::Signing("empty signing key".to_string()));
        }
        let exp_dt = issued_at + self.cfg.access_ttl();
        let claims = AccessClaims {
            iss: self.cfg.issuer().to_string(),
            sub: principal_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: exp_dt.timestamp(),
            jti: Self::gen_jti(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(AccessToken(token))
    }

    fn verify(&self, token: &str) -> Result<VerifiedClaims, SignerError> {
        self.verify_at(token, Utc::now())
    }

    fn config(&self) -> &JwtConfig {
        &self.cfg
    }
}
