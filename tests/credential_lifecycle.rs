use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokenward::application_impl::{JwtHs256Signer, RealCredentialService};
use tokenward::application_port::*;
use tokenward::domain_model::*;
use tokenward::domain_port::{CacheEntry, SessionStore};
use tokenward::infra_memory::MemorySessionStore;

const ACCESS_TTL: u64 = 900;
const REFRESH_TTL: u64 = 7 * 24 * 60 * 60;

struct Harness {
    signer: Arc<JwtHs256Signer>,
    store: Arc<MemorySessionStore>,
    service: RealCredentialService,
}

fn harness() -> Harness {
    let cfg = JwtConfig::new(
        "tokenward.test",
        Duration::from_secs(ACCESS_TTL),
        Duration::from_secs(REFRESH_TTL),
        b"integration-secret".to_vec(),
    )
    .unwrap();
    let signer = Arc::new(JwtHs256Signer::new(cfg));
    let store = Arc::new(MemorySessionStore::new());
    let service = RealCredentialService::new(signer.clone(), store.clone());
    Harness {
        signer,
        store,
        service,
    }
}

fn pid(s: &str) -> PrincipalId {
    s.parse().unwrap()
}

/// Replace the session row's access token with one that expired an hour ago.
async fn expire_access_token(h: &Harness, principal: &PrincipalId, role: Role) -> String {
    let raw = match h.store.get(&session_key(principal)).await.unwrap() {
        CacheEntry::Found(raw) => raw,
        CacheEntry::Absent => panic!("no session row for {}", principal),
    };
    let mut row: SessionRow = serde_json::from_str(&raw).unwrap();
    let issued = Utc::now() - chrono::Duration::seconds(3600);
    row.access_token = h.signer.mint(principal, role, issued).unwrap().0;
    h.store
        .set(&session_key(principal), &serde_json::to_string(&row).unwrap(), 60)
        .await
        .unwrap();
    row.access_token
}

#[tokio::test]
async fn issued_token_validates_to_its_principal() {
    let h = harness();
    for (p, role) in [("p1", Role::User), ("p2", Role::Staff), ("a:b:c", Role::User)] {
        let creds = h.service.create_credentials(&pid(p), role).await.unwrap();
        assert_eq!(creds.expires_in, h.service.config().access_ttl().as_secs());

        let who = h.service.validate_token(&creds.access_token.0).await.unwrap();
        assert_eq!(who.principal_id, pid(p));
        assert_eq!(who.role, role);
    }
}

#[tokio::test]
async fn rotation_invalidates_previous_access_token() {
    let h = harness();
    let issued = h.service.create_credentials(&pid("p1"), Role::User).await.unwrap();
    h.service.refresh_token(&issued.refresh_token.0).await.unwrap();

    // Still cryptographically fine, but no longer the live session token.
    assert!(h.signer.verify(&issued.access_token.0).is_ok());
    assert!(matches!(
        h.service.validate_token(&issued.access_token.0).await,
        Err(CredentialError::Unauthenticated)
    ));
}

#[tokio::test]
async fn refresh_token_is_single_use() {
    let h = harness();
    let issued = h.service.create_credentials(&pid("p1"), Role::User).await.unwrap();
    h.service.refresh_token(&issued.refresh_token.0).await.unwrap();
    assert!(matches!(
        h.service.refresh_token(&issued.refresh_token.0).await,
        Err(CredentialError::RefreshTokenNotFound)
    ));
}

#[tokio::test]
async fn silent_renewal_keeps_refresh_token() {
    let h = harness();
    let p1 = pid("p1");
    let issued = h.service.get_credentials(&p1, Role::User).await.unwrap();
    let expired = expire_access_token(&h, &p1, Role::User).await;

    let renewed = h.service.get_credentials(&p1, Role::User).await.unwrap();
    assert_eq!(renewed.refresh_token, issued.refresh_token);
    assert_ne!(renewed.access_token.0, expired);
    assert_eq!(renewed.expires_in, ACCESS_TTL);

    let who = h.service.validate_token(&renewed.access_token.0).await.unwrap();
    assert_eq!(who.principal_id, p1);

    // The untouched refresh row still rotates.
    let rotated = h.service.refresh_token(&issued.refresh_token.0).await.unwrap();
    assert_ne!(rotated.refresh_token, issued.refresh_token);
}

#[tokio::test]
async fn renewal_reissues_when_refresh_row_is_gone() {
    let h = harness();
    let p1 = pid("p1");
    let issued = h.service.get_credentials(&p1, Role::User).await.unwrap();
    expire_access_token(&h, &p1, Role::User).await;
    h.store
        .delete(&refresh_key(&issued.refresh_token.0))
        .await
        .unwrap();

    let fresh = h.service.get_credentials(&p1, Role::User).await.unwrap();
    assert_ne!(fresh.refresh_token, issued.refresh_token);
    assert!(h.service.validate_token(&fresh.access_token.0).await.is_ok());
    assert!(h.service.refresh_token(&fresh.refresh_token.0).await.is_ok());
}

#[tokio::test]
async fn expired_token_is_rejected_by_validate() {
    let h = harness();
    let p1 = pid("p1");
    h.service.create_credentials(&p1, Role::User).await.unwrap();
    let expired = expire_access_token(&h, &p1, Role::User).await;

    assert!(matches!(
        h.service.validate_token(&expired).await,
        Err(CredentialError::Unauthenticated)
    ));
}

#[test]
fn refresh_ttl_must_outlive_access_ttl() {
    for (access, refresh) in [(60, 59), (3600, 1), (2, 1)] {
        let r = JwtConfig::new(
            "tokenward.test",
            Duration::from_secs(access),
            Duration::from_secs(refresh),
            b"k".to_vec(),
        );
        assert!(matches!(r, Err(SignerError::InvalidConfig(_))));
    }
}

#[tokio::test]
async fn full_issue_rotate_scenario() {
    let h = harness();
    let p1 = pid("p1");

    let first = h.service.create_credentials(&p1, Role::User).await.unwrap();
    let (t1, f1) = (first.access_token.0.clone(), first.refresh_token.0.clone());
    let who = h.service.validate_token(&t1).await.unwrap();
    assert_eq!((who.principal_id, who.role), (p1.clone(), Role::User));

    let second = h.service.refresh_token(&f1).await.unwrap();
    let (t2, f2) = (second.access_token.0.clone(), second.refresh_token.0.clone());
    assert_ne!(t2, t1);
    assert_ne!(f2, f1);

    assert!(h.service.validate_token(&t1).await.is_err());
    let who = h.service.validate_token(&t2).await.unwrap();
    assert_eq!((who.principal_id, who.role), (p1.clone(), Role::User));

    assert!(matches!(
        h.service.refresh_token(&f1).await,
        Err(CredentialError::RefreshTokenNotFound)
    ));
}

#[tokio::test]
async fn new_issue_supersedes_previous_session() {
    let h = harness();
    let p1 = pid("p1");
    let old = h.service.create_credentials(&p1, Role::User).await.unwrap();
    let new = h.service.create_credentials(&p1, Role::Staff).await.unwrap();

    assert!(h.service.validate_token(&old.access_token.0).await.is_err());
    assert_eq!(
        h.service.validate_token(&new.access_token.0).await.unwrap().role,
        Role::Staff
    );
}

#[tokio::test]
async fn concurrent_refresh_has_one_winner() {
    let h = harness();
    let issued = h.service.create_credentials(&pid("p1"), Role::User).await.unwrap();
    let token = issued.refresh_token.0.clone();

    let results = join_all((0..16).map(|_| h.service.refresh_token(&token))).await;
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(CredentialError::RefreshTokenNotFound)))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 15);
}

#[tokio::test]
async fn concurrent_renewal_leaves_a_usable_session() {
    let h = harness();
    let p1 = pid("p1");
    let issued = h.service.get_credentials(&p1, Role::User).await.unwrap();
    expire_access_token(&h, &p1, Role::User).await;

    let results = join_all((0..4).map(|_| h.service.get_credentials(&p1, Role::User))).await;
    for r in &results {
        let creds = r.as_ref().unwrap();
        assert_eq!(creds.refresh_token, issued.refresh_token);
    }

    let current = h.service.get_credentials(&p1, Role::User).await.unwrap();
    assert!(h.service.validate_token(&current.access_token.0).await.is_ok());
}

#[tokio::test]
async fn sign_out_removes_both_rows() {
    let h = harness();
    let p1 = pid("p1");
    let issued = h.service.create_credentials(&p1, Role::User).await.unwrap();
    assert_eq!(h.store.live_keys(), 2);

    h.service.sign_out(&p1).await.unwrap();
    assert_eq!(h.store.live_keys(), 0);
    assert!(h.service.validate_token(&issued.access_token.0).await.is_err());
    assert!(matches!(
        h.service.refresh_token(&issued.refresh_token.0).await,
        Err(CredentialError::RefreshTokenNotFound)
    ));

    // Nothing to sign out is not an error.
    h.service.sign_out(&p1).await.unwrap();
}

#[tokio::test]
async fn token_from_rotated_secret_is_rejected() {
    let h = harness();
    let p1 = pid("p1");
    h.service.create_credentials(&p1, Role::User).await.unwrap();

    let other = JwtHs256Signer::new(
        JwtConfig::new(
            "tokenward.test",
            Duration::from_secs(ACCESS_TTL),
            Duration::from_secs(REFRESH_TTL),
            b"previous-secret".to_vec(),
        )
        .unwrap(),
    );
    let foreign = other.mint(&p1, Role::User, Utc::now()).unwrap();
    assert!(matches!(
        h.service.validate_token(&foreign.0).await,
        Err(CredentialError::Unauthenticated)
    ));

    // A session row holding such a token cannot be renewed silently.
    let row = SessionRow {
        access_token: foreign.0,
        role: Role::User,
        refresh_token: "r".to_string(),
    };
    h.store
        .set(&session_key(&p1), &serde_json::to_string(&row).unwrap(), 60)
        .await
        .unwrap();
    assert!(matches!(
        h.service.get_credentials(&p1, Role::User).await,
        Err(CredentialError::CorruptSession)
    ));
}
