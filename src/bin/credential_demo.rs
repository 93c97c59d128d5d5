//! Walks one principal through issue, validate, rotate and sign-out against
//! the in-process store, printing each step.
//!
//! $ TOKENWARD_STAFF=settings/staff.json cargo run --bin credential_demo -- 6530000021
use std::sync::Arc;
use std::time::Duration;
use tokenward::application_impl::{JsonStaffDirectory, JwtHs256Signer, RealCredentialService};
use tokenward::application_port::{CredentialService, JwtConfig};
use tokenward::domain_model::PrincipalId;
use tokenward::domain_port::RoleDirectory;
use tokenward::infra_memory::MemorySessionStore;
use tokenward::logger::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "credential_demo=debug,tokenward=debug".to_string(),
    })?;

    let identity = std::env::args().nth(1).unwrap_or_else(|| "6530000021".to_string());
    let principal_id: PrincipalId = identity.parse()?;

    let directory = match std::env::var("TOKENWARD_STAFF") {
        Ok(path) => JsonStaffDirectory::load(path)?,
        Err(_) => JsonStaffDirectory::empty(),
    };
    let role = directory.role_for(&identity);

    let cfg = JwtConfig::new(
        "tokenward.demo",
        Duration::from_secs(60),
        Duration::from_secs(600),
        b"demo-only-secret".to_vec(),
    )?;
    let service = RealCredentialService::new(
        Arc::new(JwtHs256Signer::new(cfg)),
        Arc::new(MemorySessionStore::new()),
    );

    let issued = service.get_credentials(&principal_id, role).await?;
    info!(%principal_id, %role, expires_in = issued.expires_in, "issued");

    let who = service.validate_token(&issued.access_token.0).await?;
    info!(?who, "validated");

    let rotated = service.refresh_token(&issued.refresh_token.0).await?;
    info!(
        changed = rotated.access_token != issued.access_token,
        "rotated"
    );

    let stale = service.validate_token(&issued.access_token.0).await;
    info!(rejected = stale.is_err(), "old access token after rotation");

    let reused = service.refresh_token(&issued.refresh_token.0).await;
    info!(rejected = reused.is_err(), "old refresh token after rotation");

    service.sign_out(&principal_id).await?;
    let after = service.validate_token(&rotated.access_token.0).await;
    info!(rejected = after.is_err(), "access token after sign out");

    Ok(())
}
