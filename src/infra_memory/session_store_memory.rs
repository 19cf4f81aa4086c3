use crate::domain_port::*;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const PURGE_EVERY_WRITES: u64 = 256;

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Slot {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// In-process TTL store. Expiry is read from the injected clock, so tests can
/// step time forward instead of sleeping.
pub struct MemorySessionStore {
    entries: DashMap<String, Slot>,
    clock: Arc<dyn Clock>,
    writes: AtomicU64,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemorySessionStore {
            entries: DashMap::new(),
            clock,
            writes: AtomicU64::new(0),
        }
    }

    /// Drops every entry whose TTL has elapsed. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn raw_len(&self) -> usize {
        self.entries.len()
    }

    fn slot(&self, value: &str, ttl: Duration) -> Slot {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Slot {
            value: value.to_string(),
            expires_at,
        }
    }

    fn note_write(&self) {
        let n = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if n % PURGE_EVERY_WRITES == 0 {
            self.purge_expired();
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            self.entries.remove(key);
            return Ok(());
        }
        let slot = self.slot(value, ttl);
        self.entries.insert(key.to_string(), slot);
        self.note_write();
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        if ttl.is_zero() {
            return Ok(false);
        }
        let now = self.clock.now();
        let slot = self.slot(value, ttl);
        let inserted = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    false
                } else {
                    occupied.insert(slot);
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                true
            }
        };
        if inserted {
            self.note_write();
        }
        Ok(inserted)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value.clone()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .map(|slot| slot.is_live(now))
            .unwrap_or(false))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(match self.entries.remove(key) {
            Some((_, slot)) => slot.is_live(now),
            None => false,
        })
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && entry.value().is_live(now))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Arc<ManualClock>, MemorySessionStore) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = MemorySessionStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn entries_disappear_after_ttl() {
        let (clock, store) = store();
        store.set("k", "v", Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        clock.advance(TimeDelta::seconds(10));
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.purge_expired(), 0);
    }

    #[tokio::test]
    async fn purge_reclaims_expired_entries() {
        let (clock, store) = store();
        store.set("a", "1", Duration::from_secs(1)).await.unwrap();
        store.set("b", "2", Duration::from_secs(100)).await.unwrap();
        clock.advance(TimeDelta::seconds(2));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.raw_len(), 1);
    }

    #[tokio::test]
    async fn set_if_absent_respects_live_entries_only() {
        let (clock, store) = store();
        assert!(store.set_if_absent("k", "1", Duration::from_secs(5)).await.unwrap());
        assert!(!store.set_if_absent("k", "2", Duration::from_secs(5)).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("1"));

        clock.advance(TimeDelta::seconds(6));
        assert!(store.set_if_absent("k", "3", Duration::from_secs(5)).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn delete_reports_only_the_first_removal() {
        let (_, store) = store();
        store.set("k", "v", Duration::from_secs(5)).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn scan_matches_prefix_and_skips_expired() {
        let (clock, store) = store();
        store.set("refresh:1:a", "x", Duration::from_secs(5)).await.unwrap();
        store.set("refresh:1:b", "y", Duration::from_secs(50)).await.unwrap();
        store.set("refresh:12:c", "z", Duration::from_secs(50)).await.unwrap();
        clock.advance(TimeDelta::seconds(10));

        let found = store.scan_prefix("refresh:1:").await.unwrap();
        assert_eq!(found, vec![("refresh:1:b".to_string(), "y".to_string())]);
    }

    #[tokio::test]
    async fn zero_ttl_writes_are_never_visible() {
        let (_, store) = store();
        store.set("k", "v", Duration::ZERO).await.unwrap();
        assert!(!store.exists("k").await.unwrap());
        assert!(!store.set_if_absent("k", "v", Duration::ZERO).await.unwrap());
    }
}
