use crate::domain_model::*;
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("token malformed: {0}")]
    TokenMalformed(String),
    #[error("token expired")]
    TokenExpired,
    #[error("token revoked")]
    TokenRevoked,
    #[error("token type mismatch: expected {expected}, got {actual}")]
    TokenTypeMismatch {
        expected: TokenType,
        actual: TokenType,
    },
    #[error("refresh token not found")]
    RefreshTokenNotFound,
    #[error("session limit of {0} exceeded")]
    SessionLimitExceeded(usize),
    #[error("principal inactive")]
    PrincipalInactive,
    #[error("role forbidden")]
    RoleForbidden,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("too many tokens issued this second")]
    IssueContention,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Infrastructure failures and exhausted issue slots may be retried;
    /// every other kind is final for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::StoreUnavailable(_) | AuthError::IssueContention
        )
    }

    /// Text safe to show a client. Specific failure kinds stay in logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::StoreUnavailable(_) => "service unavailable",
            AuthError::IssueContention => "try again later",
            AuthError::Internal(_) => "internal error",
            _ => "unauthorized",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Corrupt { .. } => AuthError::Internal(error.to_string()),
            other => AuthError::StoreUnavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<TokenPair> for AuthTokens {
    fn from(pair: TokenPair) -> Self {
        AuthTokens {
            access_expires_at: pair.access.claims.expires_at,
            refresh_expires_at: pair.refresh.claims.expires_at,
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
        }
    }
}

/// Surface exposed to the web/API layer. Every failure comes back as a
/// typed `AuthError`; mapping to transport status codes is the caller's
/// business.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, principal: &Principal) -> Result<AuthTokens, AuthError>;
    async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthTokens, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, access_token: &str) -> Result<(), AuthError>;
    async fn logout_session(&self, refresh_token: &str) -> Result<(), AuthError>;
    async fn logout_all(&self, subject_id: SubjectId) -> Result<usize, AuthError>;
    async fn verify(&self, access_token: &str) -> Result<Claims, AuthError>;
    fn require_role(&self, claims: &Claims, roles: &[Role]) -> bool;
    async fn require_active(&self, claims: &Claims) -> Result<Principal, AuthError>;
    async fn sessions(&self, subject_id: SubjectId) -> Result<Vec<RefreshRecord>, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn only_transient_failures_are_retryable_or_distinguishable() {
        let store: AuthError = StoreError::Timeout(Duration::from_secs(5)).into();
        assert!(store.is_retryable());
        assert_eq!(store.public_message(), "service unavailable");
        assert!(AuthError::IssueContention.is_retryable());
        assert_eq!(AuthError::IssueContention.public_message(), "try again later");

        for err in [
            AuthError::TokenExpired,
            AuthError::TokenRevoked,
            AuthError::RefreshTokenNotFound,
            AuthError::PrincipalInactive,
            AuthError::TokenMalformed("bad".to_string()),
        ] {
            assert!(!err.is_retryable());
            assert_eq!(err.public_message(), "unauthorized");
        }
    }

    #[test]
    fn corrupt_entries_are_internal_errors() {
        let err: AuthError = StoreError::Corrupt {
            key: "refresh:1:aa".to_string(),
            reason: "eof".to_string(),
        }
        .into();
        assert!(matches!(err, AuthError::Internal(_)));
        assert!(!err.is_retryable());
    }
}
