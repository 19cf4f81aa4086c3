use crate::application_port::{
    AuthConfig, RefreshReusePolicy, SessionLimitPolicy, SigningAlgorithm,
};
use crate::domain_model::{Principal, Role, SubjectId};
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

pub const SECRET_ENV: &str = "TOKENWARD_SIGNING_SECRET";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub store: Store,
    pub log: Log,
    #[serde(default)]
    pub principals: Vec<PrincipalEntry>,
}

#[derive(Deserialize)]
pub struct Auth {
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub max_concurrent_sessions: usize,
    pub store_timeout_ms: u64,
    pub algorithm: SigningAlgorithm,
    pub session_limit_policy: SessionLimitPolicy,
    pub refresh_reuse_policy: RefreshReusePolicy,
    pub signing_secret: Option<String>,
    pub key_id: Option<String>,
}

// hand-written so the secret never reaches the logs
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("max_concurrent_sessions", &self.max_concurrent_sessions)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("algorithm", &self.algorithm)
            .field("session_limit_policy", &self.session_limit_policy)
            .field("refresh_reuse_policy", &self.refresh_reuse_policy)
            .field("signing_secret", &self.signing_secret.as_ref().map(|_| "***"))
            .field("key_id", &self.key_id)
            .finish()
    }
}

impl Auth {
    pub fn to_config(&self) -> AuthConfig {
        AuthConfig {
            access_ttl: Duration::from_secs(self.access_ttl_secs),
            refresh_ttl: Duration::from_secs(self.refresh_ttl_secs),
            max_concurrent_sessions: self.max_concurrent_sessions,
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            algorithm: self.algorithm,
            session_limit_policy: self.session_limit_policy,
            refresh_reuse_policy: self.refresh_reuse_policy,
        }
    }

    /// The configured secret, else the `TOKENWARD_SIGNING_SECRET` variable.
    pub fn resolve_secret(&self) -> Result<String> {
        match &self.signing_secret {
            Some(secret) if !secret.is_empty() => Ok(secret.clone()),
            _ => std::env::var(SECRET_ENV)
                .map_err(|_| anyhow!("no signing secret configured; set {}", SECRET_ENV)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    pub redis_dsn: Option<String>,
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct PrincipalEntry {
    pub id: i64,
    pub username: String,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    pub password_hash: String,
}

fn default_active() -> bool {
    true
}

impl PrincipalEntry {
    pub fn principal(&self) -> Principal {
        Principal {
            id: SubjectId(self.id),
            username: self.username.clone(),
            role: self.role,
            active: self.active,
        }
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("TOKENWARD").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
