//! Event cache entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{CachedEvent, LocalEvent, MonthBucket, MonthYearKey};
use domain::services::StoreError;
use sqlx::FromRow;

/// Database row mapping for the event_month_buckets table.
#[derive(Debug, Clone, FromRow)]
pub struct MonthBucketEntity {
    pub month_year_key: String,
    pub year: i32,
    pub month: i32,
    pub events: serde_json::Value,
    pub event_count: i32,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl MonthBucketEntity {
    /// Convert to domain model. Fails on a malformed key or events payload.
    pub fn into_domain(self) -> Result<MonthBucket, StoreError> {
        let key = parse_key(&self.month_year_key)?;
        let events: Vec<LocalEvent> = serde_json::from_value(self.events)?;

        Ok(MonthBucket {
            month_year_key: key,
            year: key.year(),
            month: key.month(),
            event_count: events.len(),
            events,
            last_synced_at: self.last_synced_at,
            created_at: self.created_at,
        })
    }
}

/// Database row mapping for the cached_events table.
#[derive(Debug, Clone, FromRow)]
pub struct CachedEventEntity {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub month_year_at_start: String,
    pub month_year_at_end: String,
    pub last_updated: DateTime<Utc>,
}

impl CachedEventEntity {
    /// Convert to domain model.
    ///
    /// The month columns are recomputed from the dates rather than trusted.
    pub fn into_domain(self) -> Result<CachedEvent, StoreError> {
        // Still parse the stored columns so corrupt rows surface.
        parse_key(&self.month_year_at_start)?;
        parse_key(&self.month_year_at_end)?;

        Ok(CachedEvent {
            id: self.id,
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
            month_year_at_start: MonthYearKey::from_date(self.start_date),
            month_year_at_end: MonthYearKey::from_date(self.end_date),
            last_updated: self.last_updated,
        })
    }
}

fn parse_key(value: &str) -> Result<MonthYearKey, StoreError> {
    value
        .parse::<MonthYearKey>()
        .map_err(|_| StoreError::Backend(format!("Corrupt month-year key in store: {}", value)))
}
