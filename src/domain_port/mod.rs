mod clock;
mod principal_repo;
mod secret_provider;
mod session_store;

pub use clock::*;
pub use principal_repo::*;
pub use secret_provider::*;
pub use session_store::*;
