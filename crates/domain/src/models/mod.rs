//! Domain models for SIASIS.

pub mod attendance;
pub mod event;
pub mod report;

pub use attendance::{
    AttendanceCounts, AttendanceReport, ChartDataPoint, ChartSummary, ClassroomDailyCounts,
    ClassroomMonthlyCounts,
};
pub use event::{
    CachedEvent, FullSyncReport, LocalEvent, MonthBucket, MonthYearKey, RemoteEvent, SyncResult,
};
pub use report::{
    ClassroomSelection, EducationLevel, GradeSelection, ReportParameters, ReportType,
    SectionSelection, TimeRange,
};
