//! Remote collaborators.
//!
//! The school's REST APIs are the source of record for reports and events.
//! The domain only sees these traits; HTTP implementations live in the API
//! crate and tests use in-process fakes.

use thiserror::Error;

use crate::models::{AttendanceReport, MonthYearKey, RemoteEvent, ReportType};

/// Errors from the remote events API.
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("Event source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response from event source: {0}")]
    InvalidResponse(String),
}

/// Errors from the remote report API.
#[derive(Debug, Error)]
pub enum ReportSourceError {
    #[error("Report not found: {0}")]
    NotFound(String),

    #[error("Report source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response from report source: {0}")]
    InvalidResponse(String),
}

/// Remote list of school events.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Events that touch the given month.
    async fn fetch_month(&self, key: &MonthYearKey) -> Result<Vec<RemoteEvent>, EventSourceError>;
}

/// Remote attendance report API.
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch the report identified by an encoded report key.
    async fn fetch_report(
        &self,
        key: &str,
        report_type: ReportType,
    ) -> Result<AttendanceReport, ReportSourceError>;
}
