mod role_directory;
mod session_store;

pub use role_directory::*;
pub use session_store::*;
