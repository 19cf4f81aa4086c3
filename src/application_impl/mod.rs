mod access_gate;
mod auth_service_impl;
mod principal_directory;
mod refresh_token_registry;
mod revocation_registry;
mod session_store_bounded;
mod token_codec_jwt;
mod token_issuer;
mod token_verifier;

pub use access_gate::*;
pub use auth_service_impl::*;
pub use principal_directory::*;
pub use refresh_token_registry::*;
pub use revocation_registry::*;
pub use session_store_bounded::*;
pub use token_codec_jwt::*;
pub use token_issuer::*;
pub use token_verifier::*;
