use crate::domain_model::{PrincipalId, Role};
use serde::{Deserialize, Serialize};

/// Cache row keyed by principal. At most one exists per principal; writing a
/// new one supersedes the previous value at that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub access_token: String,
    pub role: Role,
    pub refresh_token: String,
}

/// Cache row keyed by an opaque refresh token value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRow {
    pub principal_id: PrincipalId,
    pub role: Role,
}

pub fn session_key(principal_id: &PrincipalId) -> String {
    format!("session:{}", principal_id)
}

pub fn refresh_key(refresh_token: &str) -> String {
    format!("refresh:{}", refresh_token)
}
