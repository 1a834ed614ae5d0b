//! School calendar events and their month-bucketed local cache.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{parse_iso_date, validate_month, validate_month_year_key};
use validator::ValidationError;

/// Identity of a month bucket, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthYearKey {
    year: i32,
    month: u32,
}

impl MonthYearKey {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        validate_month(month)?;
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self::from_date(instant.date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month, rolling over into January of the next year.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every key from `self` through `end`, inclusive. Empty if `end < self`.
    pub fn range_to(&self, end: &MonthYearKey) -> Vec<MonthYearKey> {
        let mut keys = Vec::new();
        let mut current = *self;
        while current <= *end {
            keys.push(current);
            current = current.next();
        }
        keys
    }
}

impl std::fmt::Display for MonthYearKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for MonthYearKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_month_year_key(s)?;
        // The regex guarantees both halves are digits.
        let (year, month) = s.split_at(4);
        let year = year.parse::<i32>().map_err(|_| ValidationError::new("year"))?;
        let month = month[1..]
            .parse::<u32>()
            .map_err(|_| ValidationError::new("month"))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for MonthYearKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse()
            .map_err(|_| format!("invalid month-year key: {}", value))
    }
}

impl From<MonthYearKey> for String {
    fn from(key: MonthYearKey) -> Self {
        key.to_string()
    }
}

/// Event as returned by the remote events API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvent {
    #[serde(rename = "Id_Evento")]
    pub id: i64,
    #[serde(rename = "Nombre")]
    pub name: String,
    #[serde(rename = "Fecha_Inicio")]
    pub start_date: String,
    #[serde(rename = "Fecha_Conclusion")]
    pub end_date: String,
}

/// Event as held inside a month bucket. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEvent {
    pub id: i64,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

impl LocalEvent {
    /// Whether the remote copy carries the same name and dates.
    ///
    /// Remote dates may include a time part; they are compared after
    /// normalization when they parse, raw otherwise.
    pub fn matches(&self, remote: &RemoteEvent) -> bool {
        self.id == remote.id
            && self.name == remote.name
            && self.start_date == normalize_date(&remote.start_date)
            && self.end_date == normalize_date(&remote.end_date)
    }
}

fn normalize_date(value: &str) -> String {
    parse_iso_date(value)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| value.to_string())
}

/// Event row of the month-indexed event store.
///
/// `month_year_at_start` / `month_year_at_end` are derived from the dates
/// on every write so an event can be found from any month it touches,
/// whichever bucket it was synced through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEvent {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub month_year_at_start: MonthYearKey,
    pub month_year_at_end: MonthYearKey,
    pub last_updated: DateTime<Utc>,
}

impl CachedEvent {
    /// Build the cached row for a remote event, validating its dates.
    pub fn from_remote(remote: &RemoteEvent, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let start_date = parse_iso_date(&remote.start_date)?;
        let end_date = parse_iso_date(&remote.end_date)?;

        if end_date < start_date {
            let mut err = ValidationError::new("date_order");
            err.message = Some("Event ends before it starts".into());
            return Err(err);
        }

        Ok(Self {
            id: remote.id,
            name: remote.name.clone(),
            start_date,
            end_date,
            month_year_at_start: MonthYearKey::from_date(start_date),
            month_year_at_end: MonthYearKey::from_date(end_date),
            last_updated: now,
        })
    }

    /// Whether the event overlaps the given month.
    pub fn touches(&self, key: &MonthYearKey) -> bool {
        self.month_year_at_start <= *key && *key <= self.month_year_at_end
    }

    pub fn to_local(&self) -> LocalEvent {
        LocalEvent {
            id: self.id,
            name: self.name.clone(),
            start_date: self.start_date.format("%Y-%m-%d").to_string(),
            end_date: self.end_date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Locally cached events of one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub month_year_key: MonthYearKey,
    pub year: i32,
    pub month: u32,
    pub events: Vec<LocalEvent>,
    pub event_count: usize,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl MonthBucket {
    /// Empty bucket created at `now`.
    pub fn new(key: MonthYearKey, now: DateTime<Utc>) -> Self {
        Self {
            month_year_key: key,
            year: key.year(),
            month: key.month(),
            events: Vec::new(),
            event_count: 0,
            last_synced_at: now,
            created_at: now,
        }
    }

    /// Replace the events, ordered by start date then id, and stamp the sync time.
    pub fn replace_events(&mut self, mut events: Vec<LocalEvent>, now: DateTime<Utc>) {
        events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        self.event_count = events.len();
        self.events = events;
        self.last_synced_at = now;
    }

    pub fn contains_event(&self, id: i64) -> bool {
        self.events.iter().any(|e| e.id == id)
    }
}

/// Outcome of synchronizing one month bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub month_year_key: MonthYearKey,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub errors: usize,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl SyncResult {
    pub fn new(
        key: MonthYearKey,
        added: usize,
        updated: usize,
        removed: usize,
        errors: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "Sincronización de {}: {} agregados, {} actualizados, {} eliminados, {} errores",
            key, added, updated, removed, errors
        );
        Self {
            month_year_key: key,
            added,
            updated,
            removed,
            errors,
            message,
            timestamp,
        }
    }

    /// Result for a month that could not be synchronized at all.
    pub fn failed(key: MonthYearKey, reason: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            month_year_key: key,
            added: 0,
            updated: 0,
            removed: 0,
            errors: 1,
            message: format!("Sincronización de {} fallida: {}", key, reason),
            timestamp,
        }
    }

    /// True when nothing changed and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0 && self.errors == 0
    }
}

/// Outcome of a full synchronization pass over several months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSyncReport {
    pub pruned_buckets: usize,
    pub months: Vec<SyncResult>,
    pub timestamp: DateTime<Utc>,
}

impl FullSyncReport {
    pub fn total_errors(&self) -> usize {
        self.months.iter().map(|m| m.errors).sum()
    }

    pub fn total_changes(&self) -> usize {
        self.months
            .iter()
            .map(|m| m.added + m.updated + m.removed)
            .sum()
    }
}
