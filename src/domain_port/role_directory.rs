use crate::domain_model::Role;

/// Immutable lookup built once at startup and shared by reference.
pub trait RoleDirectory: Send + Sync {
    fn role_for(&self, identity: &str) -> Role;
}

#[derive(Debug, thiserror::Error)]
pub enum RoleDirectoryError {
    #[error("cannot read staff list: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed staff list: {0}")]
    Parse(#[from] serde_json::Error),
}
