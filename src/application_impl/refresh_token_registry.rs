use crate::application_port::AuthError;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Per-subject set of live refresh-token hashes.
///
/// Records live under `refresh:{sub}:{hash}` with a TTL equal to the token's
/// remaining lifetime, so expired sessions drop out of every count without a
/// sweeper.
/// Issue instant and same-second slot of the newest refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueMark {
    pub issued_at: DateTime<Utc>,
    pub slot: u32,
}

pub struct RefreshTokenRegistry {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl RefreshTokenRegistry {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        RefreshTokenRegistry { store, clock }
    }

    fn key(subject_id: SubjectId, token_hash: &TokenHash) -> String {
        format!("refresh:{}:{}", subject_id, token_hash)
    }

    fn subject_prefix(subject_id: SubjectId) -> String {
        format!("refresh:{}:", subject_id)
    }

    fn issue_mark_key(subject_id: SubjectId) -> String {
        format!("refresh-mark:{}", subject_id)
    }

    fn parse(key: &str, value: &str) -> Result<RefreshRecord, AuthError> {
        serde_json::from_str(value).map_err(|e| {
            StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Inserts the record unless one with the same hash is already live.
    /// Returns `false` on such a collision.
    pub async fn store(&self, record: &RefreshRecord) -> Result<bool, AuthError> {
        let ttl = (record.expires_at - self.clock.now())
            .to_std()
            .map_err(|_| AuthError::Internal("refresh record already expired".to_string()))?;
        let value =
            serde_json::to_string(record).map_err(|e| AuthError::Internal(e.to_string()))?;
        let key = Self::key(record.subject_id, &record.token_hash);
        Ok(self.store.set_if_absent(&key, &value, ttl).await?)
    }

    pub async fn exists(
        &self,
        subject_id: SubjectId,
        token_hash: &TokenHash,
    ) -> Result<bool, AuthError> {
        Ok(self.store.exists(&Self::key(subject_id, token_hash)).await?)
    }

    /// Atomic check-and-delete. Exactly one concurrent caller sees `true`.
    pub async fn remove(
        &self,
        subject_id: SubjectId,
        token_hash: &TokenHash,
    ) -> Result<bool, AuthError> {
        Ok(self.store.delete(&Self::key(subject_id, token_hash)).await?)
    }

    pub async fn remove_all(&self, subject_id: SubjectId) -> Result<usize, AuthError> {
        let entries = self
            .store
            .scan_prefix(&Self::subject_prefix(subject_id))
            .await?;
        let mut removed = 0;
        for (key, _) in entries {
            if self.store.delete(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn count_active(&self, subject_id: SubjectId) -> Result<usize, AuthError> {
        Ok(self
            .store
            .scan_prefix(&Self::subject_prefix(subject_id))
            .await?
            .len())
    }

    pub async fn oldest(&self, subject_id: SubjectId) -> Result<Option<TokenHash>, AuthError> {
        Ok(self
            .records(subject_id)
            .await?
            .into_iter()
            .next()
            .map(|record| record.token_hash))
    }

    /// Last issue instant and slot handed out to the subject. Within one
    /// second, new refresh tokens take a slot above it so a consumed token
    /// can never be minted again.
    pub async fn issue_mark(&self, subject_id: SubjectId) -> Result<Option<IssueMark>, AuthError> {
        let key = Self::issue_mark_key(subject_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let corrupt = |reason: String| {
            AuthError::from(StoreError::Corrupt {
                key: key.clone(),
                reason,
            })
        };
        let (secs, slot) = raw
            .split_once(':')
            .ok_or_else(|| corrupt(format!("expected secs:slot, got {raw}")))?;
        let secs = secs.parse::<i64>().map_err(|e| corrupt(e.to_string()))?;
        let slot = slot.parse::<u32>().map_err(|e| corrupt(e.to_string()))?;
        Ok(DateTime::from_timestamp(secs, 0).map(|issued_at| IssueMark { issued_at, slot }))
    }

    pub async fn record_issue(&self, record: &RefreshRecord, slot: u32) -> Result<(), AuthError> {
        let Ok(ttl) = (record.expires_at - self.clock.now()).to_std() else {
            return Ok(());
        };
        self.store
            .set(
                &Self::issue_mark_key(record.subject_id),
                &format!("{}:{}", record.issued_at.timestamp(), slot),
                ttl,
            )
            .await?;
        Ok(())
    }

    /// Live sessions of a subject, oldest first. Tokens of one second differ
    /// by slot, and a later slot expires earlier.
    pub async fn records(&self, subject_id: SubjectId) -> Result<Vec<RefreshRecord>, AuthError> {
        let entries = self
            .store
            .scan_prefix(&Self::subject_prefix(subject_id))
            .await?;
        let mut records = entries
            .iter()
            .map(|(key, value)| Self::parse(key, value))
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| {
            a.issued_at
                .cmp(&b.issued_at)
                .then_with(|| b.expires_at.cmp(&a.expires_at))
                .then_with(|| a.token_hash.cmp(&b.token_hash))
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemorySessionStore;
    use chrono::TimeDelta;
    use std::time::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn registry() -> (Arc<ManualClock>, Arc<MemorySessionStore>, RefreshTokenRegistry) {
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(MemorySessionStore::new(clock.clone()));
        let registry = RefreshTokenRegistry::new(store.clone(), clock.clone());
        (clock, store, registry)
    }

    fn record(sub: i64, hash: &str, issued_offset: i64, ttl_secs: i64) -> RefreshRecord {
        let issued_at = start() + TimeDelta::seconds(issued_offset);
        RefreshRecord {
            subject_id: SubjectId(sub),
            token_hash: TokenHash(hash.to_string()),
            issued_at,
            expires_at: issued_at + TimeDelta::seconds(ttl_secs),
        }
    }

    #[tokio::test]
    async fn store_exists_remove() {
        let (_, _, registry) = registry();
        let r = record(1, "aa", 0, 60);
        assert!(registry.store(&r).await.unwrap());
        assert!(!registry.store(&r).await.unwrap());
        assert!(registry.exists(SubjectId(1), &r.token_hash).await.unwrap());
        assert!(!registry.exists(SubjectId(2), &r.token_hash).await.unwrap());

        assert!(registry.remove(SubjectId(1), &r.token_hash).await.unwrap());
        assert!(!registry.remove(SubjectId(1), &r.token_hash).await.unwrap());
        assert!(!registry.exists(SubjectId(1), &r.token_hash).await.unwrap());
    }

    #[tokio::test]
    async fn counts_are_per_subject_and_ttl_bound() {
        let (clock, _, registry) = registry();
        registry.store(&record(1, "aa", 0, 10)).await.unwrap();
        registry.store(&record(1, "bb", 0, 100)).await.unwrap();
        registry.store(&record(11, "cc", 0, 100)).await.unwrap();
        assert_eq!(registry.count_active(SubjectId(1)).await.unwrap(), 2);
        assert_eq!(registry.count_active(SubjectId(11)).await.unwrap(), 1);

        clock.advance(TimeDelta::seconds(10));
        assert_eq!(registry.count_active(SubjectId(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn oldest_orders_by_issue_time() {
        let (_, _, registry) = registry();
        registry.store(&record(1, "zz", 0, 100)).await.unwrap();
        registry.store(&record(1, "aa", 5, 100)).await.unwrap();
        registry.store(&record(1, "mm", 3, 100)).await.unwrap();
        assert_eq!(
            registry.oldest(SubjectId(1)).await.unwrap(),
            Some(TokenHash("zz".to_string()))
        );
        let order: Vec<_> = registry
            .records(SubjectId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.token_hash.0)
            .collect();
        assert_eq!(order, vec!["zz", "mm", "aa"]);
        assert_eq!(registry.oldest(SubjectId(9)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_all_clears_only_that_subject() {
        let (_, _, registry) = registry();
        registry.store(&record(1, "aa", 0, 100)).await.unwrap();
        registry.store(&record(1, "bb", 1, 100)).await.unwrap();
        registry.store(&record(2, "cc", 0, 100)).await.unwrap();
        assert_eq!(registry.remove_all(SubjectId(1)).await.unwrap(), 2);
        assert_eq!(registry.count_active(SubjectId(1)).await.unwrap(), 0);
        assert_eq!(registry.count_active(SubjectId(2)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_second_records_order_by_slot() {
        let (_, _, registry) = registry();
        registry.store(&record(1, "aa", 0, 98)).await.unwrap();
        registry.store(&record(1, "bb", 0, 100)).await.unwrap();
        registry.store(&record(1, "cc", 0, 99)).await.unwrap();
        let order: Vec<_> = registry
            .records(SubjectId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.token_hash.0)
            .collect();
        assert_eq!(order, vec!["bb", "cc", "aa"]);
    }

    #[tokio::test]
    async fn issue_mark_survives_remove_all() {
        let (clock, _, registry) = registry();
        assert_eq!(registry.issue_mark(SubjectId(1)).await.unwrap(), None);

        let r = record(1, "aa", 4, 100);
        registry.store(&r).await.unwrap();
        registry.record_issue(&r, 3).await.unwrap();
        registry.remove_all(SubjectId(1)).await.unwrap();
        assert_eq!(
            registry.issue_mark(SubjectId(1)).await.unwrap(),
            Some(IssueMark {
                issued_at: r.issued_at,
                slot: 3,
            })
        );

        clock.advance(TimeDelta::seconds(104));
        assert_eq!(registry.issue_mark(SubjectId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_issue_mark_is_internal() {
        let (_, store, registry) = registry();
        store
            .set("refresh-mark:1", "1700000000", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            registry.issue_mark(SubjectId(1)).await,
            Err(AuthError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_records_surface_as_internal_errors() {
        let (_, store, registry) = registry();
        store
            .set("refresh:1:bad", "{not json", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            registry.records(SubjectId(1)).await,
            Err(AuthError::Internal(_))
        ));
    }
}
