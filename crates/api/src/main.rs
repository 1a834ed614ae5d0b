use anyhow::{Context, Result};
use domain::services::{
    EventCacheStore, EventCacheSynchronizer, EventSource, InMemoryEventStore, ReportSource,
};
use persistence::repositories::EventCacheRepository;
use shared::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use siasis_api::app::{create_app, AppState};
use siasis_api::config::Config;
use siasis_api::jobs::{EventSyncJob, JobScheduler, PoolMetricsJob};
use siasis_api::middleware::{self, init_metrics};
use siasis_api::services::{
    HttpEventSource, HttpReportSource, ReportService, UnconfiguredReportSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting SIASIS API v{}", env!("CARGO_PKG_VERSION"));

    let database = config.database_pool_config();
    let (pool, store) = if database.is_configured() {
        let pool = persistence::db::create_pool(&database).await?;
        persistence::db::run_migrations(&pool).await?;

        let store: Arc<dyn EventCacheStore> = Arc::new(EventCacheRepository::new(pool.clone()));
        (Some(pool), store)
    } else {
        warn!("No database configured, event cache is kept in memory");
        let store: Arc<dyn EventCacheStore> = Arc::new(InMemoryEventStore::new());
        (None, store)
    };

    let clock = Arc::new(SystemClock);
    let synchronizer = Arc::new(EventCacheSynchronizer::new(store, clock.clone()));

    let event_source: Option<Arc<dyn EventSource>> = if config.remote.events_base_url.is_empty() {
        None
    } else {
        Some(Arc::new(HttpEventSource::new(&config.remote)?))
    };

    let report_source: Arc<dyn ReportSource> = if config.remote.reports_base_url.is_empty() {
        warn!("No report API configured, chart requests will fail");
        Arc::new(UnconfiguredReportSource)
    } else {
        Arc::new(HttpReportSource::new(&config.remote)?)
    };
    let reports = Arc::new(ReportService::new(report_source, clock, &config.reports));

    let mut scheduler = JobScheduler::new();
    if config.sync.enabled {
        if let Some(source) = &event_source {
            scheduler.register(EventSyncJob::new(
                Arc::clone(&synchronizer),
                Arc::clone(source),
                config.sync.interval_minutes,
                config.sync.months_ahead,
            ));
        }
    }
    if let Some(pool) = &pool {
        scheduler.register(PoolMetricsJob::new(pool.clone()));
    }
    scheduler.start();

    let addr = config.socket_addr()?;
    let state = AppState {
        config: Arc::new(config),
        pool,
        synchronizer,
        reports,
        event_source,
    };
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
