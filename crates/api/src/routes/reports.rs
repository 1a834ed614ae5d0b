//! Attendance report endpoint handlers.

use axum::{extract::State, Json};
use domain::models::{AttendanceReport, ReportParameters, ReportType};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::ReportChart;

/// Response for key encoding.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportKeyResponse {
    pub key: String,
    pub report_type: ReportType,
}

/// Chart request for a report fetched from the report API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    pub parameters: ReportParameters,
    /// Year the day labels are computed for; defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,
}

/// Chart request for a report supplied by the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub report: AttendanceReport,
    #[serde(default)]
    pub year: Option<i32>,
}

/// Encode report parameters into a report key.
///
/// POST /api/v1/reports/key
pub async fn encode_key(
    State(state): State<AppState>,
    Json(parameters): Json<ReportParameters>,
) -> Result<Json<ReportKeyResponse>, ApiError> {
    let key = state.reports.report_key(&parameters)?;

    Ok(Json(ReportKeyResponse {
        key,
        report_type: parameters.report_type,
    }))
}

/// Fetch a report and build its chart series.
///
/// POST /api/v1/reports/chart
pub async fn report_chart(
    State(state): State<AppState>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<ReportChart>, ApiError> {
    let chart = state
        .reports
        .chart(&request.parameters, request.year)
        .await?;

    info!(
        key = chart.key.as_deref().unwrap_or_default(),
        points = chart.points.len(),
        cached = chart.cached,
        "Report chart built"
    );

    Ok(Json(chart))
}

/// Build the chart series of a report supplied in the body.
///
/// POST /api/v1/reports/chart/transform
pub async fn transform_report(
    State(state): State<AppState>,
    Json(request): Json<TransformRequest>,
) -> Json<ReportChart> {
    Json(state.reports.transform(&request.report, request.year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_request_year_is_optional() {
        let body = r#"{
            "parameters": {
                "reportType": "M",
                "timeRange": {"fromMonth": 3, "toMonth": 5},
                "classroom": {"level": "S"}
            }
        }"#;
        let request: ChartRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.year, None);
        assert_eq!(request.parameters.report_type, ReportType::ByMonth);
    }

    #[test]
    fn test_key_response_serialization() {
        let json = serde_json::to_value(ReportKeyResponse {
            key: "M35S1A".to_string(),
            report_type: ReportType::ByMonth,
        })
        .unwrap();
        assert_eq!(json["key"], "M35S1A");
        assert_eq!(json["reportType"], "M");
    }
}
