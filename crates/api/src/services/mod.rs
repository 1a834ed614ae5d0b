//! External service integrations.

pub mod event_source;
pub mod report_cache;
pub mod report_service;
pub mod report_source;

pub use event_source::HttpEventSource;
pub use report_cache::ReportCache;
pub use report_service::{ReportChart, ReportService, ReportServiceError};
pub use report_source::{HttpReportSource, UnconfiguredReportSource};
