use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{EventCacheSynchronizer, EventSource};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{events, health, reports};
use crate::services::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// None when the event cache runs in memory.
    pub pool: Option<PgPool>,
    pub synchronizer: Arc<EventCacheSynchronizer>,
    pub reports: Arc<ReportService>,
    /// None when no events API is configured.
    pub event_source: Option<Arc<dyn EventSource>>,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // Development: allow any origin
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let report_routes = Router::new()
        .route("/api/v1/reports/key", post(reports::encode_key))
        .route("/api/v1/reports/chart", post(reports::report_chart))
        .route(
            "/api/v1/reports/chart/transform",
            post(reports::transform_report),
        );

    // Static segment wins over the `:month_year` capture.
    let event_routes = Router::new()
        .route("/api/v1/events", get(events::list_buckets))
        .route("/api/v1/events/sync", post(events::sync_from_remote))
        .route("/api/v1/events/:month_year", get(events::month_events))
        .route("/api/v1/events/:month_year/sync", post(events::sync_month));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(report_routes)
        .merge(event_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config.security.cors_origins))
        .with_state(state)
}
