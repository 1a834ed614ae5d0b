//! Event cache repository backed by PostgreSQL.

use async_trait::async_trait;
use domain::models::{CachedEvent, MonthBucket, MonthYearKey};
use domain::services::{EventCacheStore, StoreError};
use sqlx::PgPool;

use crate::entities::{CachedEventEntity, MonthBucketEntity};
use crate::metrics::QueryTimer;

/// PostgreSQL implementation of the event cache store.
#[derive(Clone)]
pub struct EventCacheRepository {
    pool: PgPool,
}

impl EventCacheRepository {
    /// Creates a new EventCacheRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl EventCacheStore for EventCacheRepository {
    async fn get_bucket(&self, key: &MonthYearKey) -> Result<Option<MonthBucket>, StoreError> {
        let timer = QueryTimer::new("get_event_bucket");
        let result = sqlx::query_as::<_, MonthBucketEntity>(
            r#"
            SELECT month_year_key, year, month, events, event_count, last_synced_at, created_at
            FROM event_month_buckets
            WHERE month_year_key = $1
            "#,
        )
        .bind(key.to_string())
        .fetch_optional(&self.pool)
        .await;
        timer.record_result(&result);

        result
            .map_err(backend)?
            .map(MonthBucketEntity::into_domain)
            .transpose()
    }

    async fn put_bucket(&self, bucket: &MonthBucket) -> Result<(), StoreError> {
        let events = serde_json::to_value(&bucket.events)?;
        let timer = QueryTimer::new("put_event_bucket");
        let result = sqlx::query(
            r#"
            INSERT INTO event_month_buckets
                (month_year_key, year, month, events, event_count, last_synced_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (month_year_key)
            DO UPDATE SET events = $4, event_count = $5, last_synced_at = $6
            "#,
        )
        .bind(bucket.month_year_key.to_string())
        .bind(bucket.year)
        .bind(bucket.month as i32)
        .bind(events)
        .bind(bucket.event_count as i32)
        .bind(bucket.last_synced_at)
        .bind(bucket.created_at)
        .execute(&self.pool)
        .await;
        timer.record_result(&result);
        result.map(|_| ()).map_err(backend)
    }

    async fn delete_bucket(&self, key: &MonthYearKey) -> Result<(), StoreError> {
        let timer = QueryTimer::new("delete_event_bucket");
        let result = sqlx::query("DELETE FROM event_month_buckets WHERE month_year_key = $1")
            .bind(key.to_string())
            .execute(&self.pool)
            .await;
        timer.record_result(&result);
        result.map(|_| ()).map_err(backend)
    }

    async fn list_buckets(&self) -> Result<Vec<MonthBucket>, StoreError> {
        let timer = QueryTimer::new("list_event_buckets");
        let result = sqlx::query_as::<_, MonthBucketEntity>(
            r#"
            SELECT month_year_key, year, month, events, event_count, last_synced_at, created_at
            FROM event_month_buckets
            ORDER BY month_year_key
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record_result(&result);

        result
            .map_err(backend)?
            .into_iter()
            .map(MonthBucketEntity::into_domain)
            .collect()
    }

    async fn get_event(&self, id: i64) -> Result<Option<CachedEvent>, StoreError> {
        let timer = QueryTimer::new("get_cached_event");
        let result = sqlx::query_as::<_, CachedEventEntity>(
            r#"
            SELECT id, name, start_date, end_date, month_year_at_start, month_year_at_end, last_updated
            FROM cached_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record_result(&result);

        result
            .map_err(backend)?
            .map(CachedEventEntity::into_domain)
            .transpose()
    }

    async fn put_event(&self, event: &CachedEvent) -> Result<(), StoreError> {
        let timer = QueryTimer::new("put_cached_event");
        let result = sqlx::query(
            r#"
            INSERT INTO cached_events
                (id, name, start_date, end_date, month_year_at_start, month_year_at_end, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id)
            DO UPDATE SET name = $2, start_date = $3, end_date = $4,
                          month_year_at_start = $5, month_year_at_end = $6, last_updated = $7
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.month_year_at_start.to_string())
        .bind(event.month_year_at_end.to_string())
        .bind(event.last_updated)
        .execute(&self.pool)
        .await;
        timer.record_result(&result);

        result.map(|_| ()).map_err(|e| StoreError::WriteRejected {
            id: event.id,
            reason: e.to_string(),
        })
    }

    async fn delete_event(&self, id: i64) -> Result<(), StoreError> {
        let timer = QueryTimer::new("delete_cached_event");
        let result = sqlx::query("DELETE FROM cached_events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record_result(&result);

        result.map(|_| ()).map_err(|e| StoreError::WriteRejected {
            id,
            reason: e.to_string(),
        })
    }

    async fn events_for_month(&self, key: &MonthYearKey) -> Result<Vec<CachedEvent>, StoreError> {
        let timer = QueryTimer::new("cached_events_for_month");
        // YYYY-MM strings order the same way as the months they name.
        let result = sqlx::query_as::<_, CachedEventEntity>(
            r#"
            SELECT id, name, start_date, end_date, month_year_at_start, month_year_at_end, last_updated
            FROM cached_events
            WHERE month_year_at_start <= $1 AND month_year_at_end >= $1
            ORDER BY start_date, id
            "#,
        )
        .bind(key.to_string())
        .fetch_all(&self.pool)
        .await;
        timer.record_result(&result);

        result
            .map_err(backend)?
            .into_iter()
            .map(CachedEventEntity::into_domain)
            .collect()
    }
}
