//! Common test utilities for integration tests.
//!
//! The app is built against the in-memory event cache, a fixed clock and
//! in-process fake remote sources, so no database or network is needed.

// Allow dead code in this module - not every integration test uses every helper.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use domain::models::{AttendanceReport, MonthYearKey, RemoteEvent, ReportType};
use domain::services::{
    EventCacheSynchronizer, EventSource, EventSourceError, InMemoryEventStore, ReportSource,
    ReportSourceError,
};
use serde_json::Value;
use shared::FixedClock;
use siasis_api::{
    app::{create_app, AppState},
    config::{
        Config, DatabaseConfig, LoggingConfig, RemoteConfig, ReportsConfig, SecurityConfig,
        ServerConfig, SyncConfig,
    },
    services::ReportService,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Test configuration: in-memory store, sync disabled.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 1_048_576,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig::default(),
        remote: RemoteConfig {
            events_base_url: "http://events.test".to_string(),
            reports_base_url: "http://reports.test".to_string(),
            timeout_ms: 1000,
        },
        sync: SyncConfig {
            enabled: false,
            interval_minutes: 60,
            months_ahead: 1,
        },
        reports: ReportsConfig {
            cache_ttl_secs: 300,
            cache_max_entries: 16,
        },
    }
}

/// Events API fake serving a fixed list per month.
#[derive(Default)]
pub struct FakeEventSource {
    pub months: HashMap<MonthYearKey, Vec<RemoteEvent>>,
    pub failing: Vec<MonthYearKey>,
}

#[async_trait::async_trait]
impl EventSource for FakeEventSource {
    async fn fetch_month(&self, key: &MonthYearKey) -> Result<Vec<RemoteEvent>, EventSourceError> {
        if self.failing.contains(key) {
            return Err(EventSourceError::Unavailable("connection refused".to_string()));
        }
        Ok(self.months.get(key).cloned().unwrap_or_default())
    }
}

/// Report API fake serving reports by key and counting fetches.
#[derive(Default)]
pub struct FakeReportSource {
    pub reports: HashMap<String, AttendanceReport>,
    pub fetches: AtomicUsize,
}

impl FakeReportSource {
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReportSource for FakeReportSource {
    async fn fetch_report(
        &self,
        key: &str,
        _report_type: ReportType,
    ) -> Result<AttendanceReport, ReportSourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.reports
            .get(key)
            .cloned()
            .ok_or_else(|| ReportSourceError::NotFound(key.to_string()))
    }
}

/// Handles on the collaborators behind a test app.
pub struct TestApp {
    pub router: Router,
    pub synchronizer: Arc<EventCacheSynchronizer>,
    pub reports: Arc<FakeReportSource>,
}

/// App on 2025-06-10 with the given fakes.
pub fn create_test_app_with(
    events: Option<FakeEventSource>,
    reports: FakeReportSource,
) -> TestApp {
    let config = test_config();
    let clock = Arc::new(FixedClock::at_date(2025, 6, 10));
    let synchronizer = Arc::new(EventCacheSynchronizer::new(
        Arc::new(InMemoryEventStore::new()),
        clock.clone(),
    ));
    let reports = Arc::new(reports);
    let report_service = Arc::new(ReportService::new(
        reports.clone(),
        clock,
        &config.reports,
    ));

    let event_source = events.map(|source| Arc::new(source) as Arc<dyn EventSource>);

    let state = AppState {
        config: Arc::new(config),
        pool: None,
        synchronizer: Arc::clone(&synchronizer),
        reports: report_service,
        event_source,
    };

    TestApp {
        router: create_app(state),
        synchronizer,
        reports,
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(Some(FakeEventSource::default()), FakeReportSource::default())
}

pub fn remote_event(id: i64, name: &str, start: &str, end: &str) -> RemoteEvent {
    RemoteEvent {
        id,
        name: name.to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

/// Build a request, with a JSON body when one is given.
pub fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and return the status code and parsed JSON body.
pub async fn send(router: &Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response: Response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}
