//! Attendance report payloads and chart-ready series.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::report::ReportType;

/// Classroom identifier as sent by the report API.
pub type ClassroomId = String;

/// On-time / late / absent tallies for one time bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCounts {
    #[serde(default)]
    pub on_time: u32,
    #[serde(default)]
    pub late: u32,
    #[serde(default)]
    pub absent: u32,
}

impl AttendanceCounts {
    pub fn new(on_time: u32, late: u32, absent: u32) -> Self {
        Self {
            on_time,
            late,
            absent,
        }
    }
}

/// Per-classroom counts of a daily report: month -> day -> counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomDailyCounts {
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub counts: BTreeMap<u32, BTreeMap<u32, AttendanceCounts>>,
}

/// Per-classroom counts of a monthly report: month -> counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomMonthlyCounts {
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub counts: BTreeMap<u32, AttendanceCounts>,
}

/// Raw report payload, keyed by classroom.
///
/// Serialized as `{"reportType": "D" | "M", "data": {<classroom>: ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reportType", content = "data")]
pub enum AttendanceReport {
    #[serde(rename = "D")]
    ByDay(BTreeMap<ClassroomId, ClassroomDailyCounts>),
    #[serde(rename = "M")]
    ByMonth(BTreeMap<ClassroomId, ClassroomMonthlyCounts>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    report_type: ReportType,
    #[serde(default)]
    data: serde_json::Value,
}

// Month/day keys arrive as JSON strings; decoding `data` only once the
// report type is known keeps them out of serde's buffered content path,
// which cannot turn string keys into integers.
impl<'de> Deserialize<'de> for AttendanceReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawReport::deserialize(deserializer)?;
        let data = if raw.data.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            raw.data
        };

        match raw.report_type {
            ReportType::ByDay => serde_json::from_value(data)
                .map(AttendanceReport::ByDay)
                .map_err(de::Error::custom),
            ReportType::ByMonth => serde_json::from_value(data)
                .map(AttendanceReport::ByMonth)
                .map_err(de::Error::custom),
        }
    }
}

impl AttendanceReport {
    pub fn report_type(&self) -> ReportType {
        match self {
            AttendanceReport::ByDay(_) => ReportType::ByDay,
            AttendanceReport::ByMonth(_) => ReportType::ByMonth,
        }
    }

    /// Number of classrooms in the payload.
    pub fn classroom_count(&self) -> usize {
        match self {
            AttendanceReport::ByDay(classrooms) => classrooms.len(),
            AttendanceReport::ByMonth(classrooms) => classrooms.len(),
        }
    }

    /// Sum of `total_students` across classrooms.
    pub fn total_students(&self) -> u64 {
        match self {
            AttendanceReport::ByDay(classrooms) => classrooms
                .values()
                .map(|c| u64::from(c.total_students))
                .sum(),
            AttendanceReport::ByMonth(classrooms) => classrooms
                .values()
                .map(|c| u64::from(c.total_students))
                .sum(),
        }
    }
}

/// One bar group of the attendance chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataPoint {
    pub label: String,
    pub month: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    pub on_time_count: u64,
    pub late_count: u64,
    pub absent_count: u64,
}

/// Totals over a whole chart series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummary {
    pub total_on_time: u64,
    pub total_late: u64,
    pub total_absent: u64,
    /// Share of present records (on time + late), in percent.
    pub attendance_rate: f64,
}

impl ChartSummary {
    pub fn from_points(points: &[ChartDataPoint]) -> Self {
        let (on_time, late, absent) = points.iter().fold((0u64, 0u64, 0u64), |acc, p| {
            (
                acc.0 + p.on_time_count,
                acc.1 + p.late_count,
                acc.2 + p.absent_count,
            )
        });

        let total = on_time + late + absent;
        let attendance_rate = if total == 0 {
            0.0
        } else {
            (on_time + late) as f64 * 100.0 / total as f64
        };

        Self {
            total_on_time: on_time,
            total_late: late,
            total_absent: absent,
            attendance_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_missing_fields_default_to_zero() {
        let counts: AttendanceCounts = serde_json::from_value(json!({"onTime": 4})).unwrap();
        assert_eq!(counts, AttendanceCounts::new(4, 0, 0));
    }

    #[test]
    fn test_daily_report_deserialization() {
        let report: AttendanceReport = serde_json::from_value(json!({
            "reportType": "D",
            "data": {
                "aula-1": {
                    "totalStudents": 25,
                    "counts": {"3": {"15": {"onTime": 20, "late": 1, "absent": 0}}}
                }
            }
        }))
        .unwrap();

        assert_eq!(report.report_type(), ReportType::ByDay);
        assert_eq!(report.classroom_count(), 1);
        assert_eq!(report.total_students(), 25);
        match report {
            AttendanceReport::ByDay(classrooms) => {
                let counts = classrooms["aula-1"].counts[&3][&15];
                assert_eq!(counts, AttendanceCounts::new(20, 1, 0));
            }
            AttendanceReport::ByMonth(_) => panic!("expected daily report"),
        }
    }

    #[test]
    fn test_monthly_report_without_counts() {
        let report: AttendanceReport = serde_json::from_value(json!({
            "reportType": "M",
            "data": {"aula-2": {"totalStudents": 30}}
        }))
        .unwrap();
        assert_eq!(report.report_type(), ReportType::ByMonth);
        assert_eq!(report.total_students(), 30);
    }

    #[test]
    fn test_report_serialization_roundtrips_through_json_text() {
        let mut counts = BTreeMap::new();
        counts.insert(4, AttendanceCounts::new(10, 2, 1));
        let mut classrooms = BTreeMap::new();
        classrooms.insert(
            "aula-3".to_string(),
            ClassroomMonthlyCounts {
                total_students: 13,
                counts,
            },
        );
        let report = AttendanceReport::ByMonth(classrooms);

        let text = serde_json::to_string(&report).unwrap();
        assert!(text.contains("\"reportType\":\"M\""));
        let back: AttendanceReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_summary_rate() {
        let points = vec![ChartDataPoint {
            label: "Marzo".into(),
            month: 3,
            day: None,
            on_time_count: 70,
            late_count: 10,
            absent_count: 20,
        }];
        let summary = ChartSummary::from_points(&points);
        assert_eq!(summary.total_on_time, 70);
        assert_eq!(summary.total_absent, 20);
        assert!((summary.attendance_rate - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_of_empty_series() {
        let summary = ChartSummary::from_points(&[]);
        assert_eq!(summary, ChartSummary::default());
    }
}
