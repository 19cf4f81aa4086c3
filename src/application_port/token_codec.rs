use crate::application_port::AuthError;
use crate::domain_model::Claims;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

impl From<CodecError> for AuthError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Malformed(reason) => AuthError::TokenMalformed(reason),
            CodecError::Encode(reason) => AuthError::Internal(reason),
        }
    }
}

/// Signs and parses the compact wire form. `decode` checks integrity and
/// shape only; expiry and revocation are layered on top by the verifier.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, claims: &Claims) -> Result<String, CodecError>;
    fn decode(&self, token: &str) -> Result<Claims, CodecError>;
}
