//! Attendance report lookup and chart building.

use domain::models::{AttendanceReport, ChartDataPoint, ChartSummary, ReportParameters, ReportType};
use domain::services::{to_chart_series, ReportKeyError, ReportSource, ReportSourceError};
use serde::Serialize;
use shared::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::report_cache::ReportCache;
use crate::config::ReportsConfig;

#[derive(Debug, Error)]
pub enum ReportServiceError {
    #[error(transparent)]
    InvalidParameters(#[from] ReportKeyError),

    #[error(transparent)]
    Source(#[from] ReportSourceError),
}

/// Chart-ready view of a report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportChart {
    /// Report key, absent when the report was supplied by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub report_type: ReportType,
    pub year: i32,
    pub classroom_count: usize,
    pub total_students: u64,
    pub points: Vec<ChartDataPoint>,
    pub summary: ChartSummary,
    pub cached: bool,
}

impl ReportChart {
    fn build(key: Option<String>, report: &AttendanceReport, year: i32, cached: bool) -> Self {
        let points = to_chart_series(report, year);
        let summary = ChartSummary::from_points(&points);
        Self {
            key,
            report_type: report.report_type(),
            year,
            classroom_count: report.classroom_count(),
            total_students: report.total_students(),
            points,
            summary,
            cached,
        }
    }
}

pub struct ReportService {
    source: Arc<dyn ReportSource>,
    cache: ReportCache,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(source: Arc<dyn ReportSource>, clock: Arc<dyn Clock>, config: &ReportsConfig) -> Self {
        Self {
            source,
            cache: ReportCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_max_entries,
            ),
            clock,
        }
    }

    /// Strict key for a query.
    pub fn report_key(&self, params: &ReportParameters) -> Result<String, ReportServiceError> {
        Ok(params.encode_checked()?)
    }

    /// Fetch (or reuse) the report for a query and build its chart.
    ///
    /// `year` defaults to the current year.
    pub async fn chart(
        &self,
        params: &ReportParameters,
        year: Option<i32>,
    ) -> Result<ReportChart, ReportServiceError> {
        let key = self.report_key(params)?;
        let year = year.unwrap_or_else(|| self.clock.current_year());

        if let Some(report) = self.cache.get(&key).await {
            debug!(key = %key, "Report cache hit");
            return Ok(ReportChart::build(Some(key), &report, year, true));
        }

        let report = Arc::new(self.source.fetch_report(&key, params.report_type).await?);
        info!(
            key = %key,
            classrooms = report.classroom_count(),
            "Fetched attendance report"
        );
        self.cache.insert(key.clone(), Arc::clone(&report)).await;

        Ok(ReportChart::build(Some(key), &report, year, false))
    }

    /// Chart for a report supplied by the caller.
    pub fn transform(&self, report: &AttendanceReport, year: Option<i32>) -> ReportChart {
        let year = year.unwrap_or_else(|| self.clock.current_year());
        ReportChart::build(None, report, year, false)
    }

    pub async fn cached_reports(&self) -> usize {
        self.cache.entry_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{
        AttendanceCounts, ClassroomDailyCounts, ClassroomSelection, EducationLevel,
        GradeSelection, SectionSelection, TimeRange,
    };
    use shared::FixedClock;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ReportSource for CountingSource {
        async fn fetch_report(
            &self,
            key: &str,
            _report_type: ReportType,
        ) -> Result<AttendanceReport, ReportSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if key.ends_with('Z') {
                return Err(ReportSourceError::NotFound(key.to_string()));
            }
            let mut classroom = ClassroomDailyCounts {
                total_students: 40,
                ..Default::default()
            };
            classroom
                .counts
                .entry(3)
                .or_default()
                .insert(15, AttendanceCounts::new(38, 1, 1));
            Ok(AttendanceReport::ByDay(BTreeMap::from([(
                "1A".to_string(),
                classroom,
            )])))
        }
    }

    fn service() -> (ReportService, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let config = ReportsConfig {
            cache_ttl_secs: 60,
            cache_max_entries: 8,
        };
        let service = ReportService::new(
            source.clone(),
            Arc::new(FixedClock::at_date(2025, 6, 10)),
            &config,
        );
        (service, source)
    }

    fn daily_params(section: &str) -> ReportParameters {
        ReportParameters {
            report_type: ReportType::ByDay,
            time_range: TimeRange::days(3, 10, 3, 20),
            classroom: ClassroomSelection {
                level: EducationLevel::Primary,
                grade: GradeSelection::Grade(1),
                section: SectionSelection::Section(section.to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_chart_fetches_then_caches() {
        let (service, source) = service();
        let params = daily_params("A");

        let first = service.chart(&params, None).await.unwrap();
        assert_eq!(first.key.as_deref(), Some("D3A3KP1A"));
        assert_eq!(first.year, 2025);
        assert!(!first.cached);
        assert_eq!(first.points[0].label, "Sáb 15");
        assert_eq!(first.summary.total_on_time, 38);

        let second = service.chart(&params, Some(2024)).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.points[0].label, "Vie 15");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cached_reports().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_parameters_never_reach_source() {
        let (service, source) = service();
        let mut params = daily_params("A");
        params.time_range.to_day = None;

        let err = service.chart(&params, None).await.unwrap_err();
        assert!(matches!(err, ReportServiceError::InvalidParameters(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let (service, _) = service();
        let err = service.chart(&daily_params("Z"), None).await.unwrap_err();
        assert!(matches!(
            err,
            ReportServiceError::Source(ReportSourceError::NotFound(_))
        ));
        assert_eq!(service.cached_reports().await, 0);
    }

    #[test]
    fn test_transform_uses_clock_year() {
        let (service, _) = service();
        let report = AttendanceReport::ByDay(BTreeMap::new());
        let chart = service.transform(&report, None);
        assert_eq!(chart.year, 2025);
        assert!(chart.key.is_none());
        assert!(chart.points.is_empty());
    }
}
