//! Background job scheduler and job implementations.

mod event_sync;
mod pool_metrics;
mod scheduler;

pub use event_sync::EventSyncJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
