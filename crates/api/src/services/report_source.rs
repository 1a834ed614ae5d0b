//! HTTP client for the attendance report API.

use domain::models::{AttendanceReport, ReportType};
use domain::services::{ReportSource, ReportSourceError};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::RemoteConfig;

/// Decode a report body.
///
/// Accepts a tagged report (`{"reportType": .., "data": ..}`) or an
/// envelope whose `data` is the classroom map of the requested type.
pub(crate) fn parse_report_payload(
    body: &str,
    requested: ReportType,
) -> Result<AttendanceReport, ReportSourceError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ReportSourceError::InvalidResponse(e.to_string()))?;

    let tagged = if value.get("reportType").is_some() {
        value
    } else {
        let data = value.get("data").cloned().unwrap_or(value);
        json!({ "reportType": requested.code(), "data": data })
    };

    let report: AttendanceReport = serde_json::from_value(tagged)
        .map_err(|e| ReportSourceError::InvalidResponse(e.to_string()))?;

    if report.report_type() != requested {
        return Err(ReportSourceError::InvalidResponse(format!(
            "Expected a {} report, got {}",
            requested,
            report.report_type()
        )));
    }
    Ok(report)
}

/// `GET {base}/api/reportes-asistencia/<key>?tipo=<D|M>`.
pub struct HttpReportSource {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpReportSource {
    pub fn new(config: &RemoteConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.reports_base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}/api/reportes-asistencia/{}", self.base_url, key)
    }
}

#[async_trait::async_trait]
impl ReportSource for HttpReportSource {
    async fn fetch_report(
        &self,
        key: &str,
        report_type: ReportType,
    ) -> Result<AttendanceReport, ReportSourceError> {
        let url = self.url(key);
        debug!(url = %url, "Fetching attendance report");

        let response = self
            .client
            .get(&url)
            .query(&[("tipo", report_type.code())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReportSourceError::Unavailable(format!(
                        "Request timeout after {}ms",
                        self.timeout_ms
                    ))
                } else {
                    ReportSourceError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ReportSourceError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportSourceError::Unavailable(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportSourceError::InvalidResponse(e.to_string()))?;
        parse_report_payload(&body, report_type)
    }
}

/// Stand-in used when no report API is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredReportSource;

#[async_trait::async_trait]
impl ReportSource for UnconfiguredReportSource {
    async fn fetch_report(
        &self,
        _key: &str,
        _report_type: ReportType,
    ) -> Result<AttendanceReport, ReportSourceError> {
        Err(ReportSourceError::Unavailable(
            "Report API is not configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_report() {
        let body = r#"{"reportType": "M", "data": {"1A": {"totalStudents": 30, "counts": {"3": {"onTime": 500, "late": 10, "absent": 4}}}}}"#;
        let report = parse_report_payload(body, ReportType::ByMonth).unwrap();
        assert_eq!(report.report_type(), ReportType::ByMonth);
        assert_eq!(report.total_students(), 30);
    }

    #[test]
    fn test_parse_envelope_uses_requested_type() {
        let body = r#"{"success": true, "data": {"2B": {"totalStudents": 25, "counts": {"3": {"15": {"onTime": 20, "late": 3, "absent": 2}}}}}}"#;
        let report = parse_report_payload(body, ReportType::ByDay).unwrap();
        assert_eq!(report.report_type(), ReportType::ByDay);
        assert_eq!(report.classroom_count(), 1);
    }

    #[test]
    fn test_parse_type_mismatch() {
        let body = r#"{"reportType": "D", "data": {}}"#;
        assert!(matches!(
            parse_report_payload(body, ReportType::ByMonth),
            Err(ReportSourceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_report_payload("<html>", ReportType::ByDay).is_err());
    }

    #[test]
    fn test_report_url() {
        let source = HttpReportSource::new(&RemoteConfig {
            events_base_url: String::new(),
            reports_base_url: "https://api.example.edu/".to_string(),
            timeout_ms: 1000,
        })
        .unwrap();
        assert_eq!(
            source.url("D3A3VP1A"),
            "https://api.example.edu/api/reportes-asistencia/D3A3VP1A"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_source_is_unavailable() {
        let err = UnconfiguredReportSource
            .fetch_report("D3A3VP1A", ReportType::ByDay)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportSourceError::Unavailable(_)));
    }
}
