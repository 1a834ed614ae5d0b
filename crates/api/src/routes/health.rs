//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub event_cache: EventCacheHealth,
    pub cached_reports: usize,
}

/// Database health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseHealth {
    /// False when the service runs on the in-memory event cache.
    pub configured: bool,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Local event cache status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventCacheHealth {
    pub buckets: Option<usize>,
    pub retained_year: i32,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

async fn ping(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Full health check endpoint.
///
/// Unhealthy only when a database is configured and unreachable.
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.pool {
        Some(pool) => {
            let start = std::time::Instant::now();
            let connected = ping(pool).await;
            let latency_ms = start.elapsed().as_millis() as u64;
            DatabaseHealth {
                configured: true,
                connected,
                latency_ms: connected.then_some(latency_ms),
            }
        }
        None => DatabaseHealth {
            configured: false,
            connected: false,
            latency_ms: None,
        },
    };

    let buckets = state.synchronizer.buckets().await.ok().map(|b| b.len());
    let healthy = !database.configured || database.connected;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        event_cache: EventCacheHealth {
            buckets,
            retained_year: state.synchronizer.retained_year(),
        },
        cached_reports: state.reports.cached_reports().await,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the service can accept traffic (database connected
/// when one is configured).
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let ready = match &state.pool {
        Some(pool) => ping(pool).await,
        None => true,
    };

    if ready {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
