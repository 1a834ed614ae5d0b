//! Common validation utilities.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// `YYYY-MM` with a zero-padded month in 01..=12.
    static ref MONTH_YEAR_KEY_REGEX: Regex = Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap();
    /// Leading `YYYY-MM-DD`, optionally followed by a time part.
    static ref ISO_DATE_PREFIX_REGEX: Regex =
        Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ].*)?$").unwrap();
}

/// Validates that a month number is within 1..=12.
pub fn validate_month(month: u32) -> Result<(), ValidationError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        let mut err = ValidationError::new("month_range");
        err.message = Some("Month must be between 1 and 12".into());
        Err(err)
    }
}

/// Validates that a day-of-month number is within 1..=31.
pub fn validate_day(day: u32) -> Result<(), ValidationError> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        let mut err = ValidationError::new("day_range");
        err.message = Some("Day must be between 1 and 31".into());
        Err(err)
    }
}

/// Validates a `YYYY-MM` month-year key.
pub fn validate_month_year_key(key: &str) -> Result<(), ValidationError> {
    if MONTH_YEAR_KEY_REGEX.is_match(key) {
        Ok(())
    } else {
        let mut err = ValidationError::new("month_year_key_format");
        err.message = Some("Month-year key must have the form YYYY-MM".into());
        Err(err)
    }
}

/// Parses a calendar date given as `YYYY-MM-DD`, tolerating a trailing
/// time component (`2025-06-01T00:00:00.000Z`), which is discarded.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let invalid = || {
        let mut err = ValidationError::new("date_format");
        err.message = Some("Date must have the form YYYY-MM-DD".into());
        err
    };

    let date_part = ISO_DATE_PREFIX_REGEX
        .captures(value.trim())
        .and_then(|caps| caps.get(1))
        .ok_or_else(invalid)?;

    NaiveDate::parse_from_str(date_part.as_str(), "%Y-%m-%d").map_err(|_| invalid())
}
