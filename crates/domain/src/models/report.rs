//! Report query models.
//!
//! A report query is the UI selection (granularity, time range, classroom)
//! that identifies one attendance report. Queries are never persisted; they
//! are encoded into a compact key (see `services::report_key`) and used as
//! the cache identity of the fetched report.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use shared::validation::{validate_day, validate_month};
use validator::{Validate, ValidationError, ValidationErrors};

/// Literal value of the "every grade/section" sentinel.
pub const ALL_SENTINEL: &str = "ALL";

/// Report granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    /// One data point per (month, day).
    #[serde(rename = "D", alias = "BY_DAY")]
    ByDay,
    /// One data point per month.
    #[serde(rename = "M", alias = "BY_MONTH")]
    ByMonth,
}

impl ReportType {
    /// Single-letter code used as the key prefix.
    pub fn code(&self) -> &'static str {
        match self {
            ReportType::ByDay => "D",
            ReportType::ByMonth => "M",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// School level of a classroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "P", alias = "PRIMARIA")]
    Primary,
    #[serde(rename = "S", alias = "SECUNDARIA")]
    Secondary,
}

impl EducationLevel {
    pub fn code(&self) -> &'static str {
        match self {
            EducationLevel::Primary => "P",
            EducationLevel::Secondary => "S",
        }
    }

    /// Highest grade taught at this level.
    pub fn max_grade(&self) -> u8 {
        match self {
            EducationLevel::Primary => 6,
            EducationLevel::Secondary => 5,
        }
    }
}

impl std::fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Number(u64),
    Text(String),
}

/// Grade filter: a concrete grade, every grade, or not chosen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GradeSelection {
    Grade(u8),
    All,
    #[default]
    Unset,
}

impl std::fmt::Display for GradeSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeSelection::Grade(grade) => write!(f, "{}", grade),
            GradeSelection::All => write!(f, "{}", ALL_SENTINEL),
            GradeSelection::Unset => Ok(()),
        }
    }
}

impl Serialize for GradeSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GradeSelection::Grade(grade) => serializer.serialize_u8(*grade),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for GradeSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawSelection::deserialize(deserializer)? {
            RawSelection::Number(n) => u8::try_from(n)
                .map(GradeSelection::Grade)
                .map_err(|_| de::Error::custom(format!("grade out of range: {}", n))),
            RawSelection::Text(text) => match text.trim() {
                ALL_SENTINEL => Ok(GradeSelection::All),
                "" => Ok(GradeSelection::Unset),
                other => other
                    .parse::<u8>()
                    .map(GradeSelection::Grade)
                    .map_err(|_| de::Error::custom(format!("invalid grade: {}", other))),
            },
        }
    }
}

/// Section filter: a concrete section letter, every section, or not chosen yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum SectionSelection {
    Section(String),
    All,
    #[default]
    Unset,
}

impl std::fmt::Display for SectionSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionSelection::Section(section) => write!(f, "{}", section),
            SectionSelection::All => write!(f, "{}", ALL_SENTINEL),
            SectionSelection::Unset => Ok(()),
        }
    }
}

impl Serialize for SectionSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SectionSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(match text.trim() {
            ALL_SENTINEL => SectionSelection::All,
            "" => SectionSelection::Unset,
            other => SectionSelection::Section(other.to_string()),
        })
    }
}

/// Months (and, for daily reports, days) bounding a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub from_month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_day: Option<u32>,
    pub to_month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_day: Option<u32>,
}

impl TimeRange {
    /// Month-only range.
    pub fn months(from_month: u32, to_month: u32) -> Self {
        Self {
            from_month,
            from_day: None,
            to_month,
            to_day: None,
        }
    }

    /// Range bounded by (month, day) pairs.
    pub fn days(from_month: u32, from_day: u32, to_month: u32, to_day: u32) -> Self {
        Self {
            from_month,
            from_day: Some(from_day),
            to_month,
            to_day: Some(to_day),
        }
    }
}

/// Classroom filter of a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomSelection {
    pub level: EducationLevel,
    #[serde(default)]
    pub grade: GradeSelection,
    #[serde(default)]
    pub section: SectionSelection,
}

/// Full report query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParameters {
    pub report_type: ReportType,
    pub time_range: TimeRange,
    pub classroom: ClassroomSelection,
}

fn required(field: &str) -> ValidationError {
    let mut err = ValidationError::new("required");
    err.message = Some(format!("{} is required for daily reports", field).into());
    err
}

impl Validate for ReportParameters {
    /// Strict checks applied before a query is encoded into a key.
    ///
    /// Daily reports need both day bounds; the range must not end before
    /// it starts; a concrete grade must exist at the selected level; a
    /// concrete section is a single uppercase letter. A section may only be
    /// chosen once a grade is, since grade and section are concatenated
    /// into the key and an unset grade would let the section stand in for
    /// it.
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut failures: Vec<(&'static str, ValidationError)> = Vec::new();
        let range = &self.time_range;

        if let Err(e) = validate_month(range.from_month) {
            failures.push(("from_month", e));
        }
        if let Err(e) = validate_month(range.to_month) {
            failures.push(("to_month", e));
        }

        match self.report_type {
            ReportType::ByDay => {
                match range.from_day {
                    Some(day) => {
                        if let Err(e) = validate_day(day) {
                            failures.push(("from_day", e));
                        }
                    }
                    None => failures.push(("from_day", required("fromDay"))),
                }
                match range.to_day {
                    Some(day) => {
                        if let Err(e) = validate_day(day) {
                            failures.push(("to_day", e));
                        }
                    }
                    None => failures.push(("to_day", required("toDay"))),
                }
                if let (Some(from_day), Some(to_day)) = (range.from_day, range.to_day) {
                    if (range.from_month, from_day) > (range.to_month, to_day) {
                        let mut err = ValidationError::new("range_order");
                        err.message = Some("Time range ends before it starts".into());
                        failures.push(("time_range", err));
                    }
                }
            }
            ReportType::ByMonth => {
                if range.from_month > range.to_month {
                    let mut err = ValidationError::new("range_order");
                    err.message = Some("Time range ends before it starts".into());
                    failures.push(("time_range", err));
                }
            }
        }

        if let GradeSelection::Grade(grade) = self.classroom.grade {
            let max = self.classroom.level.max_grade();
            if grade == 0 || grade > max {
                let mut err = ValidationError::new("grade_range");
                err.message = Some(format!("Grade must be between 1 and {}", max).into());
                failures.push(("grade", err));
            }
        }

        if let SectionSelection::Section(section) = &self.classroom.section {
            let mut chars = section.chars();
            let valid = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase());
            if !valid {
                let mut err = ValidationError::new("section_format");
                err.message = Some("Section must be a single uppercase letter".into());
                failures.push(("section", err));
            }
        }

        if self.classroom.grade == GradeSelection::Unset
            && self.classroom.section != SectionSelection::Unset
        {
            let mut err = ValidationError::new("section_without_grade");
            err.message = Some("A section requires a grade selection".into());
            failures.push(("section", err));
        }

        if failures.is_empty() {
            return Ok(());
        }

        let mut errors = ValidationErrors::new();
        for (field, err) in failures {
            errors.add(field, err);
        }
        Err(errors)
    }
}
