//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod event_cache;

pub use event_cache::{CachedEventEntity, MonthBucketEntity};
