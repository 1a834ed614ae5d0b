//! Repository implementations for database operations.

pub mod event_cache;

pub use event_cache::EventCacheRepository;
