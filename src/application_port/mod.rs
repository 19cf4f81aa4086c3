mod auth_service;
mod config;
mod token_codec;

pub use auth_service::*;
pub use config::*;
pub use token_codec::*;
