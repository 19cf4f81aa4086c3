use crate::domain_model::{Principal, Role, SubjectId};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// Payload carried inside every token. The serialized form is exactly
/// `{sub, username, role, type, iat, exp}`; anything else is rejected.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub subject_id: SubjectId,
    pub username: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Builds claims for `principal` valid for `ttl` from `issued_at`,
    /// truncated to whole seconds to match the wire precision.
    pub fn for_principal(
        principal: &Principal,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Self {
        let issued_at = issued_at.trunc_subsecs(0);
        Claims {
            subject_id: principal.id,
            username: principal.username.clone(),
            role: principal.role,
            token_type,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Lifetime left at `now`, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        let left = self.expires_at - now;
        if left > TimeDelta::zero() {
            left
        } else {
            TimeDelta::zero()
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.subject_id,
            username: self.username.clone(),
            role: self.role,
            active: true,
        }
    }
}

/// Lowercase hex SHA-256 of an encoded token. Tokens only ever reach the
/// store in this form.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(pub String);

impl TokenHash {
    pub fn of(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        TokenHash(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn hash(&self) -> TokenHash {
        TokenHash::of(&self.token)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}
