//! Domain services for SIASIS.
//!
//! Services contain business logic that operates on domain models.

pub mod chart;
pub mod device_capabilities;
pub mod digit_codec;
pub mod event_cache;
pub mod event_sync;
pub mod report_key;
pub mod sources;

pub use chart::{month_name, to_chart_series, weekday_abbreviation};
pub use device_capabilities::{
    can_vibrate, vibrate, DeviceCapabilityProvider, NoDeviceCapabilities, VibrationPattern,
};
pub use digit_codec::{encode_digit, encode_digit_f64};
pub use event_cache::{diff_events, EventCacheStore, EventDiff, InMemoryEventStore, StoreError};
pub use event_sync::{EventCacheSynchronizer, SyncError};
pub use report_key::{encode_report_key, ReportKeyError};
pub use sources::{EventSource, EventSourceError, ReportSource, ReportSourceError};
