use std::time::Duration;

/// TTL-keyed key-value store shared by every request path.
///
/// Keys passed in are logical (`refresh:1:ab..`); adapters may add a
/// deployment-wide namespace in front. A zero `ttl` means the entry is
/// already dead and must not be observable afterwards.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Writes only when no live entry exists. Returns whether the write
    /// happened.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomic delete. Returns `true` only for the caller that actually
    /// removed a live entry.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Live entries whose key starts with `prefix`, as `(key, value)`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("store call cancelled")]
    Cancelled,
    #[error("corrupt store entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
