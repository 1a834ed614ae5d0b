//! Periodic synchronization of the school event cache.

use domain::services::{EventCacheSynchronizer, EventSource};
use std::sync::Arc;
use tracing::{info, warn};

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_sync_report;

/// Pulls the current month (and `months_ahead` more, within the year)
/// from the events API into the local cache.
pub struct EventSyncJob {
    synchronizer: Arc<EventCacheSynchronizer>,
    source: Arc<dyn EventSource>,
    interval_minutes: u64,
    months_ahead: u32,
}

impl EventSyncJob {
    pub fn new(
        synchronizer: Arc<EventCacheSynchronizer>,
        source: Arc<dyn EventSource>,
        interval_minutes: u64,
        months_ahead: u32,
    ) -> Self {
        Self {
            synchronizer,
            source,
            interval_minutes,
            months_ahead,
        }
    }
}

#[async_trait::async_trait]
impl Job for EventSyncJob {
    fn name(&self) -> &'static str {
        "event_sync"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    fn run_on_start(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), String> {
        let window = self.synchronizer.sync_window(self.months_ahead);
        let report = self
            .synchronizer
            .sync_from_source(self.source.as_ref(), &window)
            .await
            .map_err(|e| format!("Event sync failed: {}", e))?;

        record_sync_report(&report);

        for month in &report.months {
            info!(month = %month.month_year_key, "{}", month.message);
        }

        let errors = report.total_errors();
        if errors > 0 {
            warn!(
                errors = errors,
                months = report.months.len(),
                "Event sync finished with errors"
            );
        }

        // A pass in which every month failed is a failed run.
        let all_failed = report
            .months
            .iter()
            .all(|m| m.errors > 0 && m.added + m.updated + m.removed == 0);
        if !report.months.is_empty() && all_failed {
            return Err(format!("No month synchronized ({} errors)", errors));
        }

        Ok(())
    }
}
