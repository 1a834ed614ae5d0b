//! Database metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record database query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Count a failed query.
pub fn record_query_error(query_name: &str) {
    counter!(
        "database_query_errors_total",
        "query" => query_name.to_string()
    )
    .increment(1);
}

/// Record database connection pool metrics.
///
/// Call this function periodically to track pool health.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times a database operation and records it on completion.
///
/// ```ignore
/// let timer = QueryTimer::new("get_event_bucket");
/// let result = sqlx::query_as::<_, MonthBucketEntity>(...).fetch_optional(&pool).await;
/// timer.record_result(&result);
/// ```
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(&self.query_name, duration);
    }

    /// Record the elapsed duration, counting an error if the query failed.
    pub fn record_result<T, E>(self, result: &Result<T, E>) {
        if result.is_err() {
            record_query_error(&self.query_name);
        }
        self.record();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_creation() {
        let timer = QueryTimer::new("get_event_bucket");
        assert_eq!(timer.query_name, "get_event_bucket");
    }

    #[test]
    fn test_record_result_without_recorder_is_harmless() {
        let ok: Result<(), ()> = Ok(());
        let err: Result<(), ()> = Err(());
        QueryTimer::new("ok_query").record_result(&ok);
        QueryTimer::new("failing_query").record_result(&err);
    }
}
