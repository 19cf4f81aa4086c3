use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The wired-up service graph. Built once per process and shared by
/// reference with every request path.
pub struct App {
    pub auth_service: Arc<dyn AuthService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl App {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let mut sweeper_handle = None;
        let store: Arc<dyn SessionStore> = match settings.store.backend.as_str() {
            "memory" => {
                let store = Arc::new(MemorySessionStore::new(clock.clone()));
                sweeper_handle = Some(spawn_sweeper(store.clone(), cancel.clone()));
                store
            }
            "redis" => {
                let dsn = settings
                    .store
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.redis_dsn is required for redis"))?;
                Arc::new(RedisSessionStore::connect(dsn, settings.store.prefix.clone()).await?)
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let secrets: Arc<dyn SecretProvider> = Arc::new(StaticSecretProvider::new(
            settings.auth.resolve_secret()?,
            settings.auth.key_id.clone(),
        ));

        let directory = Arc::new(PrincipalDirectory::new());
        for entry in &settings.principals {
            directory.insert(entry.principal(), entry.password_hash.clone());
        }

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::try_new(
            settings.auth.to_config(),
            AuthDeps {
                store,
                clock,
                secrets,
                principals: directory.clone(),
                credentials: directory,
                shutdown: cancel.clone(),
            },
        )?);
        info!(backend = %settings.store.backend, principals = settings.principals.len(), "auth service ready");

        Ok(Self {
            auth_service,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
        })
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .sweeper_handle
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("sweeper task failed: {}", e);
            }
        }
    }
}

fn spawn_sweeper(store: Arc<MemorySessionStore>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let purged = store.purge_expired();
                    if purged > 0 {
                        debug!(purged, "swept expired session entries");
                    }
                }
            }
        }
    })
}
