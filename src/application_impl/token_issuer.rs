use crate::application_impl::{IssueMark, RefreshTokenRegistry, TokenVerifier};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::Clock;
use crate::logger::*;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use std::sync::Arc;

// Tokens carry whole-second timestamps and no nonce. Tokens issued to one
// subject within the same second are told apart by slot: slot `k` expires
// `k` seconds early, so `iat` never leaves the present.
const MAX_SLOTS_PER_SECOND: u32 = 8;

pub struct TokenIssuer {
    codec: Arc<dyn TokenCodec>,
    refresh_tokens: Arc<RefreshTokenRegistry>,
    verifier: Arc<TokenVerifier>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
}

impl TokenIssuer {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        refresh_tokens: Arc<RefreshTokenRegistry>,
        verifier: Arc<TokenVerifier>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        TokenIssuer {
            codec,
            refresh_tokens,
            verifier,
            clock,
            config,
        }
    }

    fn ensure_active(principal: &Principal) -> Result<(), AuthError> {
        if principal.active {
            Ok(())
        } else {
            Err(AuthError::PrincipalInactive)
        }
    }

    fn sign(
        &self,
        principal: &Principal,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        slot: u32,
    ) -> Result<IssuedToken, AuthError> {
        let lifetime = match token_type {
            TokenType::Access => self.config.access_lifetime(),
            TokenType::Refresh => self.config.refresh_lifetime(),
        };
        let early = i64::from(slot).min(lifetime.num_seconds() - 1).max(0);
        let claims = Claims::for_principal(
            principal,
            token_type,
            issued_at,
            lifetime - TimeDelta::seconds(early),
        );
        let token = self.codec.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Same-second slot a token of `lifetime` was issued in.
    fn slot_of(claims: &Claims, lifetime: TimeDelta) -> u32 {
        let early = (claims.issued_at + lifetime - claims.expires_at).num_seconds();
        u32::try_from(early).unwrap_or(0)
    }

    fn slot_limit(&self) -> u32 {
        let refresh_secs =
            u32::try_from(self.config.refresh_lifetime().num_seconds()).unwrap_or(u32::MAX);
        MAX_SLOTS_PER_SECOND.min(refresh_secs)
    }

    /// Stateless: nothing is written for access tokens.
    pub fn issue_access_token(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        Self::ensure_active(principal)?;
        self.sign(principal, TokenType::Access, self.clock.now(), 0)
    }

    pub async fn issue_refresh_token(
        &self,
        principal: &Principal,
    ) -> Result<IssuedToken, AuthError> {
        Ok(self.issue_refresh_slot(principal).await?.0)
    }

    async fn issue_refresh_slot(
        &self,
        principal: &Principal,
    ) -> Result<(IssuedToken, u32), AuthError> {
        Self::ensure_active(principal)?;
        self.make_room(principal.id).await?;
        let now = self.clock.now().trunc_subsecs(0);
        let slot = self.first_free_slot(principal.id, now, 0).await?;
        self.store_refresh(principal, now, slot).await
    }

    /// Both tokens share one issue instant and slot.
    pub async fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let (refresh, slot) = self.issue_refresh_slot(principal).await?;
        let access = self.sign(principal, TokenType::Access, refresh.claims.issued_at, slot)?;
        debug!(sub = %principal.id, "issued token pair");
        Ok(TokenPair { access, refresh })
    }

    /// Redeems `old_refresh_token` exactly once for a fresh pair.
    pub async fn rotate(&self, old_refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .verifier
            .verify(old_refresh_token, TokenType::Refresh)
            .await?;
        self.rotate_verified(old_refresh_token, &claims, &claims.principal())
            .await
    }

    /// Rotation for a token the caller has already verified. `principal`
    /// supplies the identity baked into the new pair and must carry the
    /// same subject as `claims`.
    pub async fn rotate_verified(
        &self,
        old_refresh_token: &str,
        claims: &Claims,
        principal: &Principal,
    ) -> Result<TokenPair, AuthError> {
        if principal.id != claims.subject_id {
            return Err(AuthError::Internal("rotation subject mismatch".to_string()));
        }

        // within the old token's second the replacement takes a later slot,
        // otherwise its hash would be live again
        let now = self.clock.now().trunc_subsecs(0);
        let min_slot = if claims.issued_at == now {
            Self::slot_of(claims, self.config.refresh_lifetime()).saturating_add(1)
        } else {
            0
        };
        // checked before consuming so a busy second leaves the old token usable
        let slot = self
            .first_free_slot(claims.subject_id, now, min_slot)
            .await?;

        let old_hash = TokenHash::of(old_refresh_token);
        if !self
            .refresh_tokens
            .remove(claims.subject_id, &old_hash)
            .await?
        {
            return Err(AuthError::RefreshTokenNotFound);
        }

        let (refresh, slot) = self.store_refresh(principal, now, slot).await?;
        let access = self.sign(principal, TokenType::Access, refresh.claims.issued_at, slot)?;
        debug!(sub = %claims.subject_id, slot, "rotated refresh token");
        Ok(TokenPair { access, refresh })
    }

    async fn make_room(&self, subject_id: SubjectId) -> Result<(), AuthError> {
        let limit = self.config.max_concurrent_sessions;
        let mut active = self.refresh_tokens.count_active(subject_id).await?;
        while active >= limit {
            if self.config.session_limit_policy == SessionLimitPolicy::Reject {
                debug!(sub = %subject_id, active, limit, "session limit reached");
                return Err(AuthError::SessionLimitExceeded(limit));
            }
            let Some(oldest) = self.refresh_tokens.oldest(subject_id).await? else {
                break;
            };
            if self.refresh_tokens.remove(subject_id, &oldest).await? {
                warn!(sub = %subject_id, limit, "evicted oldest session");
            }
            active -= 1;
        }
        Ok(())
    }

    async fn first_free_slot(
        &self,
        subject_id: SubjectId,
        now: DateTime<Utc>,
        min_slot: u32,
    ) -> Result<u32, AuthError> {
        let slot = match self.refresh_tokens.issue_mark(subject_id).await? {
            Some(IssueMark { issued_at, slot }) if issued_at == now => {
                min_slot.max(slot.saturating_add(1))
            }
            _ => min_slot,
        };
        if slot >= self.slot_limit() {
            warn!(sub = %subject_id, "refresh token slots exhausted for this second");
            return Err(AuthError::IssueContention);
        }
        Ok(slot)
    }

    async fn store_refresh(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
        mut slot: u32,
    ) -> Result<(IssuedToken, u32), AuthError> {
        while slot < self.slot_limit() {
            let token = self.sign(principal, TokenType::Refresh, now, slot)?;
            let record = RefreshRecord {
                subject_id: principal.id,
                token_hash: token.hash(),
                issued_at: token.claims.issued_at,
                expires_at: token.claims.expires_at,
            };
            if self.refresh_tokens.store(&record).await? {
                self.refresh_tokens.record_issue(&record, slot).await?;
                return Ok((token, slot));
            }
            slot += 1;
        }
        warn!(sub = %principal.id, "refresh token slots exhausted for this second");
        Err(AuthError::IssueContention)
    }
}
