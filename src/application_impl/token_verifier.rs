use crate::application_impl::{RefreshTokenRegistry, RevocationRegistry};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::Clock;
use crate::logger::*;
use std::sync::Arc;

pub struct TokenVerifier {
    codec: Arc<dyn TokenCodec>,
    revocations: Arc<RevocationRegistry>,
    refresh_tokens: Arc<RefreshTokenRegistry>,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        revocations: Arc<RevocationRegistry>,
        refresh_tokens: Arc<RefreshTokenRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        TokenVerifier {
            codec,
            revocations,
            refresh_tokens,
            clock,
        }
    }

    /// Full check of `token` as `expected`. Structural, type and expiry
    /// checks run before any store round-trip.
    pub async fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let result = self.check(token, expected).await;
        if let Err(e) = &result {
            debug!(error = %e, expected = %expected, "token rejected");
        }
        result
    }

    async fn check(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.codec.decode(token)?;

        if claims.token_type != expected {
            return Err(AuthError::TokenTypeMismatch {
                expected,
                actual: claims.token_type,
            });
        }

        if claims.is_expired_at(self.clock.now()) {
            return Err(AuthError::TokenExpired);
        }

        let hash = TokenHash::of(token);
        match expected {
            TokenType::Access => {
                if self.revocations.is_revoked(&hash).await? {
                    return Err(AuthError::TokenRevoked);
                }
            }
            TokenType::Refresh => {
                if !self.refresh_tokens.exists(claims.subject_id, &hash).await? {
                    return Err(AuthError::RefreshTokenNotFound);
                }
            }
        }

        Ok(claims)
    }
}
