use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Collaborators injected into the service. Nothing here is process-global.
pub struct AuthDeps {
    pub store: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub secrets: Arc<dyn SecretProvider>,
    pub principals: Arc<dyn PrincipalRepo>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub shutdown: CancellationToken,
}

pub struct RealAuthService {
    config: AuthConfig,
    codec: Arc<dyn TokenCodec>,
    refresh_tokens: Arc<RefreshTokenRegistry>,
    revocations: Arc<RevocationRegistry>,
    verifier: Arc<TokenVerifier>,
    issuer: TokenIssuer,
    principals: Arc<dyn PrincipalRepo>,
    credentials: Arc<dyn CredentialVerifier>,
}

impl RealAuthService {
    pub fn try_new(config: AuthConfig, deps: AuthDeps) -> anyhow::Result<Self> {
        config.validate()?;

        let store: Arc<dyn SessionStore> = Arc::new(BoundedSessionStore::new(
            deps.store,
            config.store_timeout,
            deps.shutdown,
        ));
        let codec: Arc<dyn TokenCodec> = Arc::new(JwtCodec::new(config.algorithm, deps.secrets));
        let refresh_tokens = Arc::new(RefreshTokenRegistry::new(
            store.clone(),
            deps.clock.clone(),
        ));
        let revocations = Arc::new(RevocationRegistry::new(
            store,
            codec.clone(),
            deps.clock.clone(),
        ));
        let verifier = Arc::new(TokenVerifier::new(
            codec.clone(),
            revocations.clone(),
            refresh_tokens.clone(),
            deps.clock.clone(),
        ));
        let issuer = TokenIssuer::new(
            codec.clone(),
            refresh_tokens.clone(),
            verifier.clone(),
            deps.clock,
            config.clone(),
        );

        Ok(Self {
            config,
            codec,
            refresh_tokens,
            revocations,
            verifier,
            issuer,
            principals: deps.principals,
            credentials: deps.credentials,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    async fn current_principal(&self, subject_id: SubjectId) -> Result<Principal, AuthError> {
        match self.principals.get_by_id(subject_id).await? {
            Some(principal) if principal.active => Ok(principal),
            _ => Err(AuthError::PrincipalInactive),
        }
    }

    /// A refresh token that verifies by signature but has no live record was
    /// either rotated already or revoked. Under `RevokeAll` that is treated
    /// as theft and every session of the subject is dropped.
    async fn on_refresh_reuse(&self, refresh_token: &str) -> Result<(), AuthError> {
        let Ok(claims) = self.codec.decode(refresh_token) else {
            return Ok(());
        };
        match self.config.refresh_reuse_policy {
            RefreshReusePolicy::Ignore => {
                debug!(sub = %claims.subject_id, "refresh token not redeemable");
            }
            RefreshReusePolicy::RevokeAll => {
                let revoked = self.refresh_tokens.remove_all(claims.subject_id).await?;
                warn!(sub = %claims.subject_id, revoked, "refresh token reuse, revoked all sessions");
            }
        }
        Ok(())
    }

    async fn rotate(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = self
            .verifier
            .verify(refresh_token, TokenType::Refresh)
            .await?;
        // role or username changes take effect at the next rotation
        let principal = self.current_principal(claims.subject_id).await?;
        let pair = self
            .issuer
            .rotate_verified(refresh_token, &claims, &principal)
            .await?;
        Ok(pair.into())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, principal: &Principal) -> Result<AuthTokens, AuthError> {
        let pair = self.issuer.issue_pair(principal).await?;
        info!(sub = %principal.id, "login");
        Ok(pair.into())
    }

    async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthTokens, AuthError> {
        let principal = self
            .credentials
            .verify(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        self.login(&principal).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        match self.rotate(refresh_token).await {
            Err(AuthError::RefreshTokenNotFound) => {
                self.on_refresh_reuse(refresh_token).await?;
                Err(AuthError::RefreshTokenNotFound)
            }
            other => other,
        }
    }

    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.codec.decode(access_token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::TokenTypeMismatch {
                expected: TokenType::Access,
                actual: claims.token_type,
            });
        }
        if self.revocations.revoke_decoded(access_token, &claims).await? {
            info!(sub = %claims.subject_id, "logout");
        }
        Ok(())
    }

    async fn logout_session(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = self.codec.decode(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::TokenTypeMismatch {
                expected: TokenType::Refresh,
                actual: claims.token_type,
            });
        }
        let hash = TokenHash::of(refresh_token);
        if self.refresh_tokens.remove(claims.subject_id, &hash).await? {
            info!(sub = %claims.subject_id, "session revoked");
        }
        Ok(())
    }

    async fn logout_all(&self, subject_id: SubjectId) -> Result<usize, AuthError> {
        let removed = self.refresh_tokens.remove_all(subject_id).await?;
        info!(sub = %subject_id, removed, "logout from all sessions");
        Ok(removed)
    }

    async fn verify(&self, access_token: &str) -> Result<Claims, AuthError> {
        self.verifier.verify(access_token, TokenType::Access).await
    }

    fn require_role(&self, claims: &Claims, roles: &[Role]) -> bool {
        AccessGate::require_role(claims, roles)
    }

    async fn require_active(&self, claims: &Claims) -> Result<Principal, AuthError> {
        self.current_principal(claims.subject_id).await
    }

    async fn sessions(&self, subject_id: SubjectId) -> Result<Vec<RefreshRecord>, AuthError> {
        self.refresh_tokens.records(subject_id).await
    }
}
