//! School event cache endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{CachedEvent, FullSyncReport, MonthBucket, MonthYearKey, RemoteEvent, SyncResult};
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_sync_report;

/// Cached event as exposed over HTTP.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<CachedEvent> for EventResponse {
    fn from(event: CachedEvent) -> Self {
        Self {
            id: event.id,
            name: event.name,
            start_date: event.start_date,
            end_date: event.end_date,
        }
    }
}

/// Events touching one month.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthEventsResponse {
    pub month_year_key: MonthYearKey,
    pub events: Vec<EventResponse>,
    /// None when the month has never been synchronized.
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Summary of one cached month bucket.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub month_year_key: MonthYearKey,
    pub event_count: usize,
    pub last_synced_at: DateTime<Utc>,
}

impl From<MonthBucket> for BucketSummary {
    fn from(bucket: MonthBucket) -> Self {
        Self {
            month_year_key: bucket.month_year_key,
            event_count: bucket.event_count,
            last_synced_at: bucket.last_synced_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListBucketsResponse {
    pub buckets: Vec<BucketSummary>,
    pub total: usize,
}

fn parse_key(raw: &str) -> Result<MonthYearKey, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("Invalid month-year key: {}", raw)))
}

/// List cached month buckets.
///
/// GET /api/v1/events
pub async fn list_buckets(
    State(state): State<AppState>,
) -> Result<Json<ListBucketsResponse>, ApiError> {
    let buckets: Vec<BucketSummary> = state
        .synchronizer
        .buckets()
        .await?
        .into_iter()
        .map(BucketSummary::from)
        .collect();
    let total = buckets.len();

    Ok(Json(ListBucketsResponse { buckets, total }))
}

/// Cached events touching a month, including events that started earlier.
///
/// GET /api/v1/events/:month_year
pub async fn month_events(
    State(state): State<AppState>,
    Path(month_year): Path<String>,
) -> Result<Json<MonthEventsResponse>, ApiError> {
    let key = parse_key(&month_year)?;

    let events = state.synchronizer.events_for_month(&key).await?;
    let last_synced_at = state
        .synchronizer
        .bucket(&key)
        .await?
        .map(|b| b.last_synced_at);

    Ok(Json(MonthEventsResponse {
        month_year_key: key,
        events: events.into_iter().map(EventResponse::from).collect(),
        last_synced_at,
    }))
}

/// Synchronize one month against a pushed remote event list.
///
/// POST /api/v1/events/:month_year/sync
pub async fn sync_month(
    State(state): State<AppState>,
    Path(month_year): Path<String>,
    Json(remote): Json<Vec<RemoteEvent>>,
) -> Result<Json<SyncResult>, ApiError> {
    let key = parse_key(&month_year)?;
    let result = state.synchronizer.sync_month(&key, &remote).await?;

    info!(month = %key, "{}", result.message);

    Ok(Json(result))
}

/// Pull the configured window from the events API and synchronize it.
///
/// POST /api/v1/events/sync
pub async fn sync_from_remote(
    State(state): State<AppState>,
) -> Result<Json<FullSyncReport>, ApiError> {
    let source = state
        .event_source
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Events API is not configured".to_string()))?;

    let window = state
        .synchronizer
        .sync_window(state.config.sync.months_ahead);
    let report = state
        .synchronizer
        .sync_from_source(source.as_ref(), &window)
        .await?;

    record_sync_report(&report);
    info!(
        months = report.months.len(),
        changes = report.total_changes(),
        errors = report.total_errors(),
        pruned = report.pruned_buckets,
        "Manual event sync finished"
    );

    Ok(Json(report))
}
