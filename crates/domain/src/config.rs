//! Device configuration: the full settings record held by the stimulator.

use serde::{Deserialize, Serialize};

use crate::protocol::{ELECTRODE_COUNT, MAX_CURRENT_MA, MIN_CURRENT_MA};

/// Configuration as reported by (or sent to) the device.
///
/// A new value replaces the previous one on every decode; it is never
/// patched field by field. Electrode currents are kept wider than the wire
/// type so that out-of-range values can be represented and rejected by the
/// encoder instead of being silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stimulation timeout, in milliseconds.
    pub timeout_ms: u16,
    /// Pulses per cycle. Zero disables stimulation timing altogether.
    pub pulse_count: u16,
    /// Width of one pulse, in µs.
    pub pulse_width_us: u16,
    /// Gap between pulses of the same cycle, in µs.
    pub pulse_interval_us: u16,
    /// Mid-phase value.
    pub mid_value: u16,
    /// Recovery time after the pulse train, in µs.
    pub recycle_us: u16,
    /// Tail duration, in µs.
    pub tail_us: u16,
    /// Per-electrode current in mA, electrodes A through H.
    pub electrode_currents: [i16; ELECTRODE_COUNT],
}

impl DeviceConfig {
    /// Whether every electrode current lies in the range the UI offers.
    #[must_use]
    pub fn currents_within_ui_range(&self) -> bool {
        self.electrode_currents
            .iter()
            .all(|c| (MIN_CURRENT_MA..=MAX_CURRENT_MA).contains(c))
    }

    /// Full stimulation period (pulse plus recycle), in µs.
    #[must_use]
    pub fn period_us(&self) -> u32 {
        u32::from(self.pulse_width_us) + u32::from(self.recycle_us)
    }
}

/// Display label of each electrode, in wire order.
pub const ELECTRODE_LABELS: [char; ELECTRODE_COUNT] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_ui_range_currents() {
        let config = DeviceConfig {
            electrode_currents: [15, -15, 0, 3, -3, 1, -1, 0],
            ..DeviceConfig::default()
        };
        assert!(config.currents_within_ui_range());
    }

    #[test]
    fn should_flag_currents_outside_ui_range() {
        let config = DeviceConfig {
            electrode_currents: [0, 0, 0, 16, 0, 0, 0, 0],
            ..DeviceConfig::default()
        };
        assert!(!config.currents_within_ui_range());
    }

    #[test]
    fn should_compute_period_from_width_and_recycle() {
        let config = DeviceConfig {
            pulse_width_us: 50,
            recycle_us: 200,
            ..DeviceConfig::default()
        };
        assert_eq!(config.period_us(), 250);
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let config = DeviceConfig {
            timeout_ms: 1000,
            pulse_count: 1,
            pulse_width_us: 50,
            electrode_currents: [1, 2, 3, 4, -4, -3, -2, -1],
            ..DeviceConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
