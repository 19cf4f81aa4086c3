use std::time::Duration;
use tokenward::domain_port::{SessionStore, StoreError};

/// Store whose calls never complete.
pub struct StalledStore;

#[async_trait::async_trait]
impl SessionStore for StalledStore {
    async fn set(&self, _: &str, _: &str, _: Duration) -> Result<(), StoreError> {
        std::future::pending().await
    }
    async fn set_if_absent(&self, _: &str, _: &str, _: Duration) -> Result<bool, StoreError> {
        std::future::pending().await
    }
    async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
        std::future::pending().await
    }
    async fn exists(&self, _: &str) -> Result<bool, StoreError> {
        std::future::pending().await
    }
    async fn delete(&self, _: &str) -> Result<bool, StoreError> {
        std::future::pending().await
    }
    async fn scan_prefix(&self, _: &str) -> Result<Vec<(String, String)>, StoreError> {
        std::future::pending().await
    }
}
