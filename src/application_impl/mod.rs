mod credential_service_impl;
mod staff_directory_impl;
mod token_signer_jwt;

pub use credential_service_impl::*;
pub use staff_directory_impl::*;
pub use token_signer_jwt::*;
