use crate::domain_port::*;
use crate::logger::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds every call on the wrapped store by a deadline and by the process
/// shutdown token. A command the backend already applied stays applied.
pub struct BoundedSessionStore {
    inner: Arc<dyn SessionStore>,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl BoundedSessionStore {
    pub fn new(inner: Arc<dyn SessionStore>, timeout: Duration, shutdown: CancellationToken) -> Self {
        BoundedSessionStore {
            inner,
            timeout,
            shutdown,
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        T: Send,
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(StoreError::Cancelled),
            res = tokio::time::timeout(self.timeout, fut) => match res {
                Ok(inner) => inner,
                Err(_) => Err(StoreError::Timeout(self.timeout)),
            },
        };
        if let Err(e) = &result {
            warn!(op, error = %e, "session store call failed");
        }
        result
    }
}

#[async_trait::async_trait]
impl SessionStore for BoundedSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.bounded("set", self.inner.set(key, value, ttl)).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.bounded("set_if_absent", self.inner.set_if_absent(key, value, ttl))
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.bounded("exists", self.inner.exists(key)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.bounded("scan_prefix", self.inner.scan_prefix(prefix))
            .await
    }
}
