mod principal;
mod session;

pub use principal::*;
pub use session::*;
