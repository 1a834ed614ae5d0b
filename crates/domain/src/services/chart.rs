//! Report chart transformer.
//!
//! Flattens per-classroom attendance counts into one chronologically
//! ordered series, summing every classroom into each time bucket.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;

use crate::models::{
    AttendanceCounts, AttendanceReport, ChartDataPoint, ClassroomDailyCounts,
    ClassroomMonthlyCounts,
};

const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Spanish weekday abbreviation used in daily chart labels.
pub fn weekday_abbreviation(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Lun",
        Weekday::Tue => "Mar",
        Weekday::Wed => "Mié",
        Weekday::Thu => "Jue",
        Weekday::Fri => "Vie",
        Weekday::Sat => "Sáb",
        Weekday::Sun => "Dom",
    }
}

/// Spanish month name for 1..=12.
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_NAMES.get(index as usize))
        .copied()
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    on_time: u64,
    late: u64,
    absent: u64,
}

impl Totals {
    fn add(&mut self, counts: &AttendanceCounts) {
        self.on_time += u64::from(counts.on_time);
        self.late += u64::from(counts.late);
        self.absent += u64::from(counts.absent);
    }
}

/// Chart series for a report.
///
/// The report payload carries no year, so weekday labels of a daily report
/// are computed against `year`; callers without a better source pass the
/// current calendar year. Days that do not exist in that year (Feb 29 in a
/// common year) are labelled with the bare day number.
pub fn to_chart_series(report: &AttendanceReport, year: i32) -> Vec<ChartDataPoint> {
    match report {
        AttendanceReport::ByDay(classrooms) => daily_series(classrooms.values(), year),
        AttendanceReport::ByMonth(classrooms) => monthly_series(classrooms.values()),
    }
}

fn daily_series<'a>(
    classrooms: impl Iterator<Item = &'a ClassroomDailyCounts>,
    year: i32,
) -> Vec<ChartDataPoint> {
    let mut buckets: BTreeMap<(u32, u32), Totals> = BTreeMap::new();

    for classroom in classrooms {
        for (month, days) in &classroom.counts {
            for (day, counts) in days {
                buckets.entry((*month, *day)).or_default().add(counts);
            }
        }
    }

    buckets
        .into_iter()
        .map(|((month, day), totals)| ChartDataPoint {
            label: day_label(year, month, day),
            month,
            day: Some(day),
            on_time_count: totals.on_time,
            late_count: totals.late,
            absent_count: totals.absent,
        })
        .collect()
}

fn monthly_series<'a>(
    classrooms: impl Iterator<Item = &'a ClassroomMonthlyCounts>,
) -> Vec<ChartDataPoint> {
    let mut buckets: BTreeMap<u32, Totals> = BTreeMap::new();

    for classroom in classrooms {
        for (month, counts) in &classroom.counts {
            buckets.entry(*month).or_default().add(counts);
        }
    }

    buckets
        .into_iter()
        .map(|(month, totals)| ChartDataPoint {
            label: month_name(month)
                .map(str::to_string)
                .unwrap_or_else(|| month.to_string()),
            month,
            day: None,
            on_time_count: totals.on_time,
            late_count: totals.late,
            absent_count: totals.absent,
        })
        .collect()
}

fn day_label(year: i32, month: u32, day: u32) -> String {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => format!("{} {}", weekday_abbreviation(date.weekday()), day),
        None => day.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportType;

    fn daily(entries: &[(&str, u32, u32, AttendanceCounts)]) -> AttendanceReport {
        let mut classrooms: BTreeMap<String, ClassroomDailyCounts> = BTreeMap::new();
        for (classroom, month, day, counts) in entries {
            classrooms
                .entry(classroom.to_string())
                .or_default()
                .counts
                .entry(*month)
                .or_default()
                .insert(*day, *counts);
        }
        AttendanceReport::ByDay(classrooms)
    }

    fn monthly(entries: &[(&str, u32, AttendanceCounts)]) -> AttendanceReport {
        let mut classrooms: BTreeMap<String, ClassroomMonthlyCounts> = BTreeMap::new();
        for (classroom, month, counts) in entries {
            classrooms
                .entry(classroom.to_string())
                .or_default()
                .counts
                .insert(*month, *counts);
        }
        AttendanceReport::ByMonth(classrooms)
    }

    #[test]
    fn test_two_classrooms_same_day_are_summed() {
        let report = daily(&[
            ("1A", 3, 15, AttendanceCounts::new(20, 1, 0)),
            ("1B", 3, 15, AttendanceCounts::new(18, 0, 2)),
        ]);
        let series = to_chart_series(&report, 2025);

        assert_eq!(series.len(), 1);
        let point = &series[0];
        assert_eq!(point.month, 3);
        assert_eq!(point.day, Some(15));
        assert_eq!(point.on_time_count, 38);
        assert_eq!(point.late_count, 1);
        assert_eq!(point.absent_count, 2);
        assert_eq!(point.label, "Sáb 15");
    }

    #[test]
    fn test_daily_series_is_chronological() {
        let report = daily(&[
            ("1A", 4, 2, AttendanceCounts::new(1, 0, 0)),
            ("1A", 3, 28, AttendanceCounts::new(1, 0, 0)),
            ("2B", 3, 3, AttendanceCounts::new(1, 0, 0)),
            ("2B", 4, 1, AttendanceCounts::new(1, 0, 0)),
        ]);
        let order: Vec<(u32, Option<u32>)> = to_chart_series(&report, 2025)
            .iter()
            .map(|p| (p.month, p.day))
            .collect();
        assert_eq!(
            order,
            vec![(3, Some(3)), (3, Some(28)), (4, Some(1)), (4, Some(2))]
        );
    }

    #[test]
    fn test_daily_totals_are_preserved() {
        let report = daily(&[
            ("1A", 5, 5, AttendanceCounts::new(10, 2, 3)),
            ("1A", 5, 6, AttendanceCounts::new(11, 0, 1)),
            ("1B", 5, 5, AttendanceCounts::new(7, 4, 0)),
            ("2A", 6, 9, AttendanceCounts::new(9, 1, 1)),
        ]);
        let series = to_chart_series(&report, 2025);
        let on_time: u64 = series.iter().map(|p| p.on_time_count).sum();
        let late: u64 = series.iter().map(|p| p.late_count).sum();
        let absent: u64 = series.iter().map(|p| p.absent_count).sum();
        assert_eq!((on_time, late, absent), (37, 7, 5));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_classroom_order_does_not_change_result() {
        let a = daily(&[
            ("X", 3, 3, AttendanceCounts::new(1, 2, 3)),
            ("Y", 3, 3, AttendanceCounts::new(4, 5, 6)),
        ]);
        let b = daily(&[
            ("Y", 3, 3, AttendanceCounts::new(1, 2, 3)),
            ("X", 3, 3, AttendanceCounts::new(4, 5, 6)),
        ]);
        assert_eq!(to_chart_series(&a, 2025), to_chart_series(&b, 2025));
    }

    #[test]
    fn test_weekday_label_depends_on_year() {
        let report = daily(&[("1A", 3, 15, AttendanceCounts::new(1, 0, 0))]);
        assert_eq!(to_chart_series(&report, 2025)[0].label, "Sáb 15");
        assert_eq!(to_chart_series(&report, 2024)[0].label, "Vie 15");
    }

    #[test]
    fn test_nonexistent_day_gets_plain_label() {
        let report = daily(&[("1A", 2, 29, AttendanceCounts::new(1, 0, 0))]);
        assert_eq!(to_chart_series(&report, 2025)[0].label, "29");
        assert_eq!(to_chart_series(&report, 2024)[0].label, "Jue 29");
    }

    #[test]
    fn test_monthly_series() {
        let report = monthly(&[
            ("1A", 5, AttendanceCounts::new(300, 20, 10)),
            ("1B", 3, AttendanceCounts::new(250, 5, 5)),
            ("1B", 5, AttendanceCounts::new(100, 0, 0)),
        ]);
        assert_eq!(report.report_type(), ReportType::ByMonth);

        let series = to_chart_series(&report, 2025);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "Marzo");
        assert_eq!(series[0].day, None);
        assert_eq!(series[1].label, "Mayo");
        assert_eq!(series[1].on_time_count, 400);
        assert_eq!(series[1].late_count, 20);
    }

    #[test]
    fn test_empty_report_yields_empty_series() {
        let report = AttendanceReport::ByDay(BTreeMap::new());
        assert!(to_chart_series(&report, 2025).is_empty());
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_name(1), Some("Enero"));
        assert_eq!(month_name(12), Some("Diciembre"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn test_large_counts_do_not_overflow() {
        let report = daily(&[
            ("A", 1, 1, AttendanceCounts::new(u32::MAX, 0, 0)),
            ("B", 1, 1, AttendanceCounts::new(u32::MAX, 0, 0)),
        ]);
        let series = to_chart_series(&report, 2025);
        assert_eq!(series[0].on_time_count, 2 * u64::from(u32::MAX));
    }
}
