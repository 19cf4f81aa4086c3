use anyhow::{Result, anyhow};
use chrono::TimeDelta;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
pub enum SigningAlgorithm {
    HS256,
    HS384,
    HS512,
}

impl From<SigningAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        match alg {
            SigningAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            SigningAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            SigningAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

/// What a login does when the subject already holds the maximum number of
/// live refresh tokens.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLimitPolicy {
    EvictOldest,
    Reject,
}

/// Reaction to a refresh token that verifies but has no live record, i.e.
/// it was already rotated or revoked.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReusePolicy {
    Ignore,
    RevokeAll,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub max_concurrent_sessions: usize,
    pub store_timeout: Duration,
    pub algorithm: SigningAlgorithm,
    pub session_limit_policy: SessionLimitPolicy,
    pub refresh_reuse_policy: RefreshReusePolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            access_ttl: Duration::from_secs(15 * 60),         // 15 minutes
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
            max_concurrent_sessions: 5,
            store_timeout: Duration::from_secs(5),
            algorithm: SigningAlgorithm::HS256,
            session_limit_policy: SessionLimitPolicy::EvictOldest,
            refresh_reuse_policy: RefreshReusePolicy::Ignore,
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.access_ttl < Duration::from_secs(1) {
            return Err(anyhow!("access_ttl must be at least one second"));
        }
        if self.refresh_ttl <= self.access_ttl {
            return Err(anyhow!("refresh_ttl must be longer than access_ttl"));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(anyhow!("max_concurrent_sessions must be at least 1"));
        }
        if self.store_timeout.is_zero() {
            return Err(anyhow!("store_timeout must be positive"));
        }
        Ok(())
    }

    /// Token lifetimes travel in whole seconds.
    pub fn access_lifetime(&self) -> TimeDelta {
        TimeDelta::seconds(self.access_ttl.as_secs() as i64)
    }

    pub fn refresh_lifetime(&self) -> TimeDelta {
        TimeDelta::seconds(self.refresh_ttl.as_secs() as i64)
    }
}
