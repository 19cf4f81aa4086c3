use crate::application_port::*;
use crate::domain_model::Claims;
use crate::domain_port::SecretProvider;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use std::collections::HashSet;
use std::sync::Arc;

/// HMAC-signed JWT codec pinned to a single algorithm.
pub struct JwtCodec {
    algorithm: Algorithm,
    secrets: Arc<dyn SecretProvider>,
}

impl JwtCodec {
    pub fn new(algorithm: SigningAlgorithm, secrets: Arc<dyn SecretProvider>) -> Self {
        JwtCodec {
            algorithm: algorithm.into(),
            secrets,
        }
    }

    fn validation(&self) -> Validation {
        let mut v = Validation::new(self.algorithm);
        // expiry belongs to the verifier, which reads time from the injected clock
        v.validate_exp = false;
        v.validate_nbf = false;
        v.validate_aud = false;
        v.required_spec_claims = HashSet::new();
        v.leeway = 0;
        v
    }
}

impl TokenCodec for JwtCodec {
    fn encode(&self, claims: &Claims) -> Result<String, CodecError> {
        if claims.expires_at <= claims.issued_at {
            return Err(CodecError::Encode("exp must be after iat".to_string()));
        }
        let secret = self.secrets.current();
        let mut header = Header::new(self.algorithm);
        header.kid = secret.key_id.clone();
        encode(
            &header,
            claims,
            &EncodingKey::from_secret(secret.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<Claims, CodecError> {
        let secret = self.secrets.current();
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| CodecError::Malformed(e.to_string()))?;
        if header.alg != self.algorithm {
            return Err(CodecError::Malformed(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        if header.kid != secret.key_id {
            return Err(CodecError::Malformed("unknown key id".to_string()));
        }

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.secret.expose_secret().as_bytes()),
            &self.validation(),
        )
        .map_err(|e| CodecError::Malformed(e.to_string()))?;

        let claims = data.claims;
        if claims.expires_at <= claims.issued_at {
            return Err(CodecError::Malformed("exp not after iat".to_string()));
        }
        Ok(claims)
    }
}
