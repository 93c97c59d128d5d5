use crate::domain_model::Role;
use crate::domain_port::{RoleDirectory, RoleDirectoryError};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct StaffFile {
    #[serde(default)]
    staffs: Vec<String>,
}

/// Staff identifiers loaded once from `{"staffs": [...]}`.
/// Every identity not listed resolves to [`Role::User`].
#[derive(Debug, Default)]
pub struct JsonStaffDirectory {
    staffs: HashSet<String>,
}

impl JsonStaffDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, RoleDirectoryError> {
        let file: StaffFile = serde_json::from_str(json)?;
        Ok(Self {
            staffs: file.staffs.into_iter().collect(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RoleDirectoryError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.staffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staffs.is_empty()
    }
}

impl RoleDirectory for JsonStaffDirectory {
    fn role_for(&self, identity: &str) -> Role {
        if self.staffs.contains(identity) {
            Role::Staff
        } else {
            Role::User
        }
    }
}
