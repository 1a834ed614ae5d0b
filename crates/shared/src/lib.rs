//! Shared utilities and common types for the SIASIS attendance backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Calendar validation (months, days, month-year keys, ISO dates)
//! - The clock abstraction used wherever "now" or "the current year" matters

pub mod clock;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
