//! Local event cache: storage contract, in-memory store and diffing.
//!
//! The cache keeps two collections, mirroring the client-side database it
//! replaces:
//! - month buckets keyed by `YYYY-MM`, each holding the ordered events last
//!   synced for that month
//! - an event index keyed by event id, carrying the derived start/end month
//!   so events can be looked up by any month they touch

use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{CachedEvent, LocalEvent, MonthBucket, MonthYearKey, RemoteEvent};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Write rejected for event {id}: {reason}")]
    WriteRejected { id: i64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistent key-value store behind the event cache.
#[async_trait::async_trait]
pub trait EventCacheStore: Send + Sync {
    async fn get_bucket(&self, key: &MonthYearKey) -> Result<Option<MonthBucket>, StoreError>;

    async fn put_bucket(&self, bucket: &MonthBucket) -> Result<(), StoreError>;

    async fn delete_bucket(&self, key: &MonthYearKey) -> Result<(), StoreError>;

    async fn list_buckets(&self) -> Result<Vec<MonthBucket>, StoreError>;

    async fn get_event(&self, id: i64) -> Result<Option<CachedEvent>, StoreError>;

    async fn put_event(&self, event: &CachedEvent) -> Result<(), StoreError>;

    async fn delete_event(&self, id: i64) -> Result<(), StoreError>;

    /// Indexed events whose start..=end months include `key`, ordered by
    /// start date then id.
    async fn events_for_month(&self, key: &MonthYearKey) -> Result<Vec<CachedEvent>, StoreError>;
}

/// Difference between the cached events of a month and the remote list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDiff {
    /// Present remotely, absent locally.
    pub added: Vec<RemoteEvent>,
    /// Present on both sides with a different name or dates.
    pub updated: Vec<RemoteEvent>,
    /// Present locally, absent remotely.
    pub removed: Vec<LocalEvent>,
    /// Present on both sides and identical.
    pub unchanged: Vec<LocalEvent>,
}

impl EventDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Compute the added/updated/removed sets of a month.
///
/// A remote id listed more than once counts once (first occurrence wins).
pub fn diff_events(local: &[LocalEvent], remote: &[RemoteEvent]) -> EventDiff {
    let local_by_id: HashMap<i64, &LocalEvent> = local.iter().map(|e| (e.id, e)).collect();
    let mut seen: HashSet<i64> = HashSet::new();
    let mut diff = EventDiff::default();

    for event in remote {
        if !seen.insert(event.id) {
            continue;
        }
        match local_by_id.get(&event.id) {
            None => diff.added.push(event.clone()),
            Some(existing) if existing.matches(event) => diff.unchanged.push((*existing).clone()),
            Some(_) => diff.updated.push(event.clone()),
        }
    }

    diff.removed = local
        .iter()
        .filter(|e| !seen.contains(&e.id))
        .cloned()
        .collect();

    diff
}

/// In-process store.
///
/// Backs the service when no database is configured and stands in for the
/// persistent store in tests. Writes for ids registered with
/// [`InMemoryEventStore::with_failing_events`] are rejected.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    buckets: RwLock<BTreeMap<MonthYearKey, MonthBucket>>,
    events: RwLock<BTreeMap<i64, CachedEvent>>,
    failing_event_ids: HashSet<i64>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects `put_event`/`delete_event` for the given ids.
    pub fn with_failing_events(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing_event_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    fn check_writable(&self, id: i64) -> Result<(), StoreError> {
        if self.failing_event_ids.contains(&id) {
            return Err(StoreError::WriteRejected {
                id,
                reason: "simulated write failure".to_string(),
            });
        }
        Ok(())
    }

    /// Number of indexed events.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait::async_trait]
impl EventCacheStore for InMemoryEventStore {
    async fn get_bucket(&self, key: &MonthYearKey) -> Result<Option<MonthBucket>, StoreError> {
        Ok(self.buckets.read().await.get(key).cloned())
    }

    async fn put_bucket(&self, bucket: &MonthBucket) -> Result<(), StoreError> {
        self.buckets
            .write()
            .await
            .insert(bucket.month_year_key, bucket.clone());
        Ok(())
    }

    async fn delete_bucket(&self, key: &MonthYearKey) -> Result<(), StoreError> {
        self.buckets.write().await.remove(key);
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<MonthBucket>, StoreError> {
        Ok(self.buckets.read().await.values().cloned().collect())
    }

    async fn get_event(&self, id: i64) -> Result<Option<CachedEvent>, StoreError> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn put_event(&self, event: &CachedEvent) -> Result<(), StoreError> {
        self.check_writable(event.id)?;
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete_event(&self, id: i64) -> Result<(), StoreError> {
        self.check_writable(id)?;
        self.events.write().await.remove(&id);
        Ok(())
    }

    async fn events_for_month(&self, key: &MonthYearKey) -> Result<Vec<CachedEvent>, StoreError> {
        let mut events: Vec<CachedEvent> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.touches(key))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn local(id: i64, name: &str, start: &str, end: &str) -> LocalEvent {
        LocalEvent {
            id,
            name: name.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
        }
    }

    fn remote(id: i64, name: &str, start: &str, end: &str) -> RemoteEvent {
        RemoteEvent {
            id,
            name: name.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
        }
    }

    fn key(year: i32, month: u32) -> MonthYearKey {
        MonthYearKey::new(year, month).unwrap()
    }

    #[test]
    fn test_diff_against_empty_local() {
        let diff = diff_events(&[], &[remote(1, "Inicio de clases", "2025-03-10", "2025-03-10")]);
        assert_eq!(diff.added.len(), 1);
        assert!(diff.updated.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn test_diff_classifies_every_case() {
        let locals = vec![
            local(1, "Same", "2025-06-01", "2025-06-01"),
            local(2, "Old name", "2025-06-05", "2025-06-05"),
            local(3, "Gone", "2025-06-07", "2025-06-07"),
        ];
        let remotes = vec![
            remote(1, "Same", "2025-06-01", "2025-06-01"),
            remote(2, "New name", "2025-06-05", "2025-06-05"),
            remote(4, "Fresh", "2025-06-09", "2025-06-10"),
        ];
        let diff = diff_events(&locals, &remotes);

        assert_eq!(diff.added.iter().map(|e| e.id).collect::<Vec<_>>(), vec![4]);
        assert_eq!(diff.updated.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(diff.removed.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(diff.unchanged.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1]);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_diff_detects_date_change() {
        let locals = vec![local(1, "Feria", "2025-06-01", "2025-06-01")];
        let remotes = vec![remote(1, "Feria", "2025-06-01", "2025-06-02")];
        assert_eq!(diff_events(&locals, &remotes).updated.len(), 1);
    }

    #[test]
    fn test_diff_ignores_duplicate_remote_ids() {
        let remotes = vec![
            remote(5, "First", "2025-06-01", "2025-06-01"),
            remote(5, "Second", "2025-06-01", "2025-06-01"),
        ];
        let diff = diff_events(&[], &remotes);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].name, "First");
    }

    #[tokio::test]
    async fn test_in_memory_bucket_crud() {
        let store = InMemoryEventStore::new();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let bucket = MonthBucket::new(key(2025, 6), now);

        store.put_bucket(&bucket).await.unwrap();
        assert_eq!(store.get_bucket(&key(2025, 6)).await.unwrap(), Some(bucket));
        assert_eq!(store.list_buckets().await.unwrap().len(), 1);

        store.delete_bucket(&key(2025, 6)).await.unwrap();
        assert!(store.get_bucket(&key(2025, 6)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_events_for_month_uses_span() {
        let store = InMemoryEventStore::new();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let spanning = CachedEvent::from_remote(
            &remote(1, "Vacaciones", "2025-07-20", "2025-09-02"),
            now,
        )
        .unwrap();
        let single =
            CachedEvent::from_remote(&remote(2, "Feriado", "2025-08-30", "2025-08-30"), now)
                .unwrap();
        store.put_event(&spanning).await.unwrap();
        store.put_event(&single).await.unwrap();

        let august: Vec<i64> = store
            .events_for_month(&key(2025, 8))
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(august, vec![1, 2]);
        assert_eq!(store.events_for_month(&key(2025, 9)).await.unwrap().len(), 1);
        assert!(store.events_for_month(&key(2025, 6)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_failing_writes() {
        let store = InMemoryEventStore::with_failing_events([9]);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let event =
            CachedEvent::from_remote(&remote(9, "x", "2025-06-01", "2025-06-01"), now).unwrap();

        let err = store.put_event(&event).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected { id: 9, .. }));
        assert!(store.delete_event(9).await.is_err());
        assert_eq!(store.event_count().await, 0);
    }

    #[test]
    fn test_diff_of_identical_lists_is_empty() {
        use fake::{faker::lorem::en::Sentence, Fake};

        let remote_events: Vec<RemoteEvent> = (1..=5)
            .map(|id| {
                let name: String = Sentence(2..5).fake();
                remote(id, &name, "2025-04-07", "2025-04-09")
            })
            .collect();
        let local_events: Vec<LocalEvent> = remote_events
            .iter()
            .map(|r| local(r.id, &r.name, &r.start_date, &r.end_date))
            .collect();

        let diff = diff_events(&local_events, &remote_events);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged.len(), 5);
    }

    #[test]
    fn test_in_memory_bucket_roundtrip_blocking() {
        let store = InMemoryEventStore::new();
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        let mut bucket = MonthBucket::new(key(2025, 4), now);
        bucket.replace_events(vec![local(3, "Semana Santa", "2025-04-14", "2025-04-18")], now);

        tokio_test::block_on(store.put_bucket(&bucket)).unwrap();
        let stored = tokio_test::block_on(store.get_bucket(&key(2025, 4)))
            .unwrap()
            .unwrap();
        assert_eq!(stored.event_count, 1);
        assert!(stored.contains_event(3));
    }
}
