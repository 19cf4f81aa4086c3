use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

/// Blacklist of access tokens logged out before expiry. Entries carry the
/// token's own remaining lifetime as TTL and vanish with it.
pub struct RevocationRegistry {
    store: Arc<dyn SessionStore>,
    codec: Arc<dyn TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl RevocationRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        codec: Arc<dyn TokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        RevocationRegistry {
            store,
            codec,
            clock,
        }
    }

    fn key(token_hash: &TokenHash) -> String {
        format!("revoked:{}", token_hash)
    }

    /// Returns whether an entry was written; an already-expired token needs
    /// none.
    pub async fn revoke(&self, token: &str) -> Result<bool, AuthError> {
        let claims = self.codec.decode(token)?;
        self.revoke_decoded(token, &claims).await
    }

    pub(crate) async fn revoke_decoded(
        &self,
        token: &str,
        claims: &Claims,
    ) -> Result<bool, AuthError> {
        let remaining = claims.remaining(self.clock.now());
        let Ok(ttl) = remaining.to_std() else {
            return Ok(false);
        };
        if ttl.is_zero() {
            return Ok(false);
        }
        let entry = RevocationEntry {
            token_hash: TokenHash::of(token),
            expires_at: claims.expires_at,
        };
        let value = serde_json::to_string(&entry).map_err(|e| AuthError::Internal(e.to_string()))?;
        self.store
            .set(&Self::key(&entry.token_hash), &value, ttl)
            .await?;
        Ok(true)
    }

    pub async fn is_revoked(&self, token_hash: &TokenHash) -> Result<bool, AuthError> {
        Ok(self.store.exists(&Self::key(token_hash)).await?)
    }
}
