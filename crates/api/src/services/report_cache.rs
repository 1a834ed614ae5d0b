//! In-memory cache of fetched attendance reports, keyed by report key.

use domain::models::AttendanceReport;
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CacheEntry {
    report: Arc<AttendanceReport>,
    inserted_at: Instant,
}

/// TTL-bounded report cache. When full, the oldest entry is evicted.
pub struct ReportCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl ReportCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<AttendanceReport>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                counter!("report_cache_hits_total").increment(1);
                Some(Arc::clone(&entry.report))
            }
            _ => {
                counter!("report_cache_misses_total").increment(1);
                None
            }
        }
    }

    pub async fn insert(&self, key: String, report: Arc<AttendanceReport>) {
        if self.max_entries == 0 {
            return;
        }

        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                report,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}
