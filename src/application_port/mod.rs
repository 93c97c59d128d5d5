mod credential_service;
mod token_signer;

pub use credential_service::*;
pub use token_signer::*;
