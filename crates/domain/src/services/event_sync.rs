//! Month-bucketed event cache synchronizer.
//!
//! Each month bucket is either absent or synced; every sync of a month
//! reconciles the cached events against the remote list:
//! - remote but not cached: added
//! - cached and remote with a different name or dates: updated
//! - cached but not remote: removed
//!
//! Per-event write failures are counted and the pass moves on. Every pass
//! first deletes buckets whose year is not the current year.
//!
//! A pass runs under a write guard and reads go through a read guard, so a
//! reader sees the bucket set either before or after a pass, never half of
//! one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use shared::Clock;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::event_cache::{diff_events, EventCacheStore, StoreError};
use super::sources::EventSource;
use crate::models::{
    CachedEvent, FullSyncReport, LocalEvent, MonthBucket, MonthYearKey, RemoteEvent, SyncResult,
};

/// Errors that abort a synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Month {key} is outside the retained year {retained_year}")]
    OutsideRetention {
        key: MonthYearKey,
        retained_year: i32,
    },
}

/// Keeps the local month buckets in step with the remote event list.
pub struct EventCacheSynchronizer {
    store: Arc<dyn EventCacheStore>,
    clock: Arc<dyn Clock>,
    pass_lock: RwLock<()>,
}

impl EventCacheSynchronizer {
    pub fn new(store: Arc<dyn EventCacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            pass_lock: RwLock::new(()),
        }
    }

    /// The only year whose buckets survive a pass.
    pub fn retained_year(&self) -> i32 {
        self.clock.current_year()
    }

    pub fn current_month(&self) -> MonthYearKey {
        MonthYearKey::from_datetime(self.clock.now())
    }

    /// The current month and up to `months_ahead` following months,
    /// stopping at December so the window stays inside the retained year.
    pub fn sync_window(&self, months_ahead: u32) -> Vec<MonthYearKey> {
        let start = self.current_month();
        let mut window = vec![start];
        let mut next = start;
        for _ in 0..months_ahead {
            next = next.next();
            if next.year() != start.year() {
                break;
            }
            window.push(next);
        }
        window
    }

    /// Synchronize one month against its remote event list.
    pub async fn sync_month(
        &self,
        key: &MonthYearKey,
        remote: &[RemoteEvent],
    ) -> Result<SyncResult, SyncError> {
        let _pass = self.pass_lock.write().await;
        self.prune_locked().await?;
        self.check_retained(key)?;
        self.sync_month_locked(key, remote).await
    }

    /// Synchronize several months in one pass.
    ///
    /// Months outside the retained year, or whose bucket cannot be read or
    /// written, are reported as failed entries; the other months proceed.
    pub async fn sync_months(
        &self,
        batches: Vec<(MonthYearKey, Vec<RemoteEvent>)>,
    ) -> Result<FullSyncReport, SyncError> {
        let _pass = self.pass_lock.write().await;
        let pruned_buckets = self.prune_locked().await?;
        let now = self.clock.now();
        let mut months = Vec::with_capacity(batches.len());

        for (key, remote) in batches {
            let result = match self.check_retained(&key) {
                Err(e) => SyncResult::failed(key, &e.to_string(), now),
                Ok(()) => match self.sync_month_locked(&key, &remote).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(month = %key, error = %e, "Month synchronization failed");
                        SyncResult::failed(key, &e.to_string(), now)
                    }
                },
            };
            months.push(result);
        }

        Ok(FullSyncReport {
            pruned_buckets,
            months,
            timestamp: now,
        })
    }

    /// Fetch each month from `source`, then apply all of them in one pass.
    ///
    /// Fetching happens before the pass starts so readers are not blocked
    /// on network I/O. A failed fetch is reported for its month only.
    pub async fn sync_from_source(
        &self,
        source: &dyn EventSource,
        months: &[MonthYearKey],
    ) -> Result<FullSyncReport, SyncError> {
        let mut fetched = Vec::with_capacity(months.len());
        let mut failed = Vec::new();

        for key in months {
            match source.fetch_month(key).await {
                Ok(events) => {
                    debug!(month = %key, count = events.len(), "Fetched remote events");
                    fetched.push((*key, events));
                }
                Err(e) => {
                    warn!(month = %key, error = %e, "Failed to fetch remote events");
                    failed.push(SyncResult::failed(*key, &e.to_string(), self.clock.now()));
                }
            }
        }

        let mut report = self.sync_months(fetched).await?;
        report.months.extend(failed);
        report.months.sort_by_key(|m| m.month_year_key);
        Ok(report)
    }

    /// Delete every bucket outside the retained year. Returns how many went.
    pub async fn prune_stale_years(&self) -> Result<usize, SyncError> {
        let _pass = self.pass_lock.write().await;
        self.prune_locked().await
    }

    /// Cached events touching a month, read consistently with passes.
    ///
    /// Once a month has been synced its bucket is authoritative: an indexed
    /// event whose span covers the month but which the bucket no longer
    /// lists was removed from that month and is left out.
    pub async fn events_for_month(
        &self,
        key: &MonthYearKey,
    ) -> Result<Vec<CachedEvent>, StoreError> {
        let _read = self.pass_lock.read().await;
        let events = self.store.events_for_month(key).await?;
        match self.store.get_bucket(key).await? {
            Some(bucket) => Ok(events
                .into_iter()
                .filter(|e| bucket.contains_event(e.id))
                .collect()),
            None => Ok(events),
        }
    }

    pub async fn bucket(&self, key: &MonthYearKey) -> Result<Option<MonthBucket>, StoreError> {
        let _read = self.pass_lock.read().await;
        self.store.get_bucket(key).await
    }

    pub async fn buckets(&self) -> Result<Vec<MonthBucket>, StoreError> {
        let _read = self.pass_lock.read().await;
        self.store.list_buckets().await
    }

    fn check_retained(&self, key: &MonthYearKey) -> Result<(), SyncError> {
        let retained_year = self.retained_year();
        if key.year() != retained_year {
            return Err(SyncError::OutsideRetention {
                key: *key,
                retained_year,
            });
        }
        Ok(())
    }

    async fn prune_locked(&self) -> Result<usize, SyncError> {
        let retained_year = self.retained_year();
        let (stale, kept): (Vec<MonthBucket>, Vec<MonthBucket>) = self
            .store
            .list_buckets()
            .await?
            .into_iter()
            .partition(|b| b.year != retained_year);

        if stale.is_empty() {
            return Ok(0);
        }

        // Events that straddle the year boundary stay indexed while a kept
        // bucket still lists them.
        let still_listed: HashSet<i64> = kept
            .iter()
            .flat_map(|b| b.events.iter().map(|e| e.id))
            .collect();

        let mut pruned = 0;
        for bucket in stale {
            for event in bucket.events.iter().filter(|e| !still_listed.contains(&e.id)) {
                if let Err(e) = self.store.delete_event(event.id).await {
                    warn!(event_id = event.id, error = %e, "Failed to drop event of stale bucket");
                }
            }

            match self.store.delete_bucket(&bucket.month_year_key).await {
                Ok(()) => {
                    pruned += 1;
                    info!(
                        month = %bucket.month_year_key,
                        retained_year = retained_year,
                        "Pruned stale month bucket"
                    );
                }
                Err(e) => {
                    warn!(month = %bucket.month_year_key, error = %e, "Failed to prune bucket");
                }
            }
        }

        Ok(pruned)
    }

    async fn sync_month_locked(
        &self,
        key: &MonthYearKey,
        remote: &[RemoteEvent],
    ) -> Result<SyncResult, SyncError> {
        let now = self.clock.now();
        let existing = self.store.get_bucket(key).await?;
        let first_sync = existing.is_none();
        let mut bucket = existing.unwrap_or_else(|| MonthBucket::new(*key, now));

        let diff = diff_events(&bucket.events, remote);
        let previous: HashMap<i64, LocalEvent> =
            bucket.events.iter().map(|e| (e.id, e.clone())).collect();
        let mut retained: HashMap<i64, LocalEvent> =
            diff.unchanged.into_iter().map(|e| (e.id, e)).collect();

        let (mut added, mut updated, mut removed, mut errors) = (0, 0, 0, 0);

        let writes = diff
            .added
            .iter()
            .map(|e| (e, false))
            .chain(diff.updated.iter().map(|e| (e, true)));
        for (event, is_update) in writes {
            match self.write_event(event).await {
                Ok(local) => {
                    retained.insert(local.id, local);
                    if is_update {
                        updated += 1;
                    } else {
                        added += 1;
                    }
                }
                Err(e) => {
                    errors += 1;
                    warn!(month = %key, event_id = event.id, error = %e, "Failed to write event");
                    if let Some(prev) = previous.get(&event.id) {
                        retained.insert(prev.id, prev.clone());
                    }
                }
            }
        }

        for event in &diff.removed {
            match self.remove_event(key, event).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    errors += 1;
                    warn!(month = %key, event_id = event.id, error = %e, "Failed to remove event");
                    retained.insert(event.id, event.clone());
                }
            }
        }

        bucket.replace_events(retained.into_values().collect(), now);
        self.store.put_bucket(&bucket).await?;

        let result = SyncResult::new(*key, added, updated, removed, errors, now);
        info!(
            month = %key,
            first_sync = first_sync,
            added = added,
            updated = updated,
            removed = removed,
            errors = errors,
            "Month bucket synchronized"
        );
        Ok(result)
    }

    async fn write_event(&self, event: &RemoteEvent) -> Result<LocalEvent, StoreError> {
        let cached = CachedEvent::from_remote(event, self.clock.now()).map_err(|e| {
            StoreError::WriteRejected {
                id: event.id,
                reason: e.to_string(),
            }
        })?;
        self.store.put_event(&cached).await?;
        Ok(cached.to_local())
    }

    async fn remove_event(&self, key: &MonthYearKey, event: &LocalEvent) -> Result<(), StoreError> {
        if let Some(cached) = self.store.get_event(event.id).await? {
            for other in cached.month_year_at_start.range_to(&cached.month_year_at_end) {
                if other == *key {
                    continue;
                }
                if let Some(bucket) = self.store.get_bucket(&other).await? {
                    if bucket.contains_event(event.id) {
                        debug!(
                            event_id = event.id,
                            month = %other,
                            "Event still listed by another month, keeping index entry"
                        );
                        return Ok(());
                    }
                }
            }
        }
        self.store.delete_event(event.id).await
    }
}
