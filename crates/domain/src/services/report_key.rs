//! Compact cache key for report queries.
//!
//! Layout: report type, then the encoded time bounds, then level, grade
//! and section. Daily keys carry four time characters
//! (`from_month from_day to_month to_day`), monthly keys two. Grade and
//! section are appended verbatim, sentinels included. Keys are one-way:
//! they identify a query, they are never parsed back.

use thiserror::Error;
use validator::{Validate, ValidationErrors};

use super::digit_codec::encode_digit;
use crate::models::{ClassroomSelection, ReportParameters, ReportType, TimeRange};

/// Errors from strict key encoding.
#[derive(Debug, Error)]
pub enum ReportKeyError {
    #[error("Invalid report parameters: {0}")]
    InvalidParameters(#[from] ValidationErrors),
}

fn encode_opt(value: Option<u32>) -> String {
    value.map(|v| encode_digit(i64::from(v))).unwrap_or_default()
}

/// Encode a report query without validating it.
///
/// Out-of-range months or days encode as empty segments, so malformed
/// input still produces a deterministic (if ambiguous) key.
pub fn encode_report_key(
    report_type: ReportType,
    time_range: &TimeRange,
    classroom: &ClassroomSelection,
) -> String {
    let mut key = String::from(report_type.code());

    match report_type {
        ReportType::ByDay => {
            key.push_str(&encode_digit(i64::from(time_range.from_month)));
            key.push_str(&encode_opt(time_range.from_day));
            key.push_str(&encode_digit(i64::from(time_range.to_month)));
            key.push_str(&encode_opt(time_range.to_day));
        }
        ReportType::ByMonth => {
            key.push_str(&encode_digit(i64::from(time_range.from_month)));
            key.push_str(&encode_digit(i64::from(time_range.to_month)));
        }
    }

    key.push_str(classroom.level.code());
    key.push_str(&classroom.grade.to_string());
    key.push_str(&classroom.section.to_string());
    key
}

impl ReportParameters {
    /// Lenient encoding, see [`encode_report_key`].
    pub fn encode(&self) -> String {
        encode_report_key(self.report_type, &self.time_range, &self.classroom)
    }

    /// Validate, then encode. Distinct valid queries get distinct keys.
    pub fn encode_checked(&self) -> Result<String, ReportKeyError> {
        self.validate()?;
        Ok(self.encode())
    }
}
