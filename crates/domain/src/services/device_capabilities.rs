//! Device capability checks.
//!
//! Haptic feedback on attendance marking is a client capability. Instead of
//! probing an ambient global, helpers take the capability provider as a
//! parameter, so the server side passes [`NoDeviceCapabilities`] and tests
//! pass a recording fake.

/// Something that may be able to vibrate.
pub trait DeviceCapabilityProvider: Send + Sync {
    fn supports_vibration(&self) -> bool;

    /// Run a pattern of alternating vibrate/pause durations in milliseconds.
    /// Returns whether the device accepted it.
    fn vibrate(&self, pattern_ms: &[u32]) -> bool;
}

/// Predefined vibration patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibrationPattern {
    Short,
    Long,
    Success,
    Error,
}

impl VibrationPattern {
    pub fn durations_ms(&self) -> &'static [u32] {
        match self {
            VibrationPattern::Short => &[50],
            VibrationPattern::Long => &[400],
            VibrationPattern::Success => &[80, 60, 80],
            VibrationPattern::Error => &[200, 100, 200, 100, 200],
        }
    }
}

/// Provider for environments without haptics (the server).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeviceCapabilities;

impl DeviceCapabilityProvider for NoDeviceCapabilities {
    fn supports_vibration(&self) -> bool {
        false
    }

    fn vibrate(&self, _pattern_ms: &[u32]) -> bool {
        false
    }
}

pub fn can_vibrate(provider: &dyn DeviceCapabilityProvider) -> bool {
    provider.supports_vibration()
}

/// Vibrate if supported; `false` when the device cannot or refused.
pub fn vibrate(provider: &dyn DeviceCapabilityProvider, pattern: VibrationPattern) -> bool {
    if !provider.supports_vibration() {
        tracing::debug!(pattern = ?pattern, "Vibration not supported, skipping");
        return false;
    }
    provider.vibrate(pattern.durations_ms())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDevice {
        patterns: Mutex<Vec<Vec<u32>>>,
    }

    impl DeviceCapabilityProvider for RecordingDevice {
        fn supports_vibration(&self) -> bool {
            true
        }

        fn vibrate(&self, pattern_ms: &[u32]) -> bool {
            self.patterns.lock().unwrap().push(pattern_ms.to_vec());
            true
        }
    }

    #[test]
    fn test_no_capabilities() {
        assert!(!can_vibrate(&NoDeviceCapabilities));
        assert!(!vibrate(&NoDeviceCapabilities, VibrationPattern::Short));
    }

    #[test]
    fn test_vibrate_forwards_pattern() {
        let device = RecordingDevice::default();
        assert!(can_vibrate(&device));
        assert!(vibrate(&device, VibrationPattern::Success));
        assert_eq!(*device.patterns.lock().unwrap(), vec![vec![80, 60, 80]]);
    }

    #[test]
    fn test_pattern_durations() {
        assert_eq!(VibrationPattern::Short.durations_ms(), &[50]);
        assert_eq!(VibrationPattern::Error.durations_ms().len(), 5);
    }
}
