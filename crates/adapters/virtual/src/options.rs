//! Knobs of the simulated stimulator.

use serde::Deserialize;

use stimlink_domain::config::DeviceConfig;
use stimlink_domain::protocol::{ELECTRODE_COUNT, TARGET_NAME};

/// How the simulated stimulator looks and misbehaves, read from the
/// `[virtual]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VirtualOptions {
    /// Advertised local name.
    pub name: String,
    /// Reported signal strength, in dBm.
    pub rssi: i16,
    /// Period between two advertisements while scanning, in milliseconds.
    pub advertise_interval_ms: u64,
    /// Discovery rounds answered with an empty service list after each
    /// connect, like a stack that is still populating its GATT cache.
    pub empty_service_polls: u32,
    /// Refuse every connection attempt.
    pub fail_connect: bool,
    /// Hide the UART service, like an unrelated device with the same name.
    pub omit_uart_service: bool,
    /// Configuration held by the device at power-up.
    pub config: DeviceConfig,
}

impl Default for VirtualOptions {
    fn default() -> Self {
        Self {
            name: TARGET_NAME.to_owned(),
            rssi: -55,
            advertise_interval_ms: 500,
            empty_service_polls: 2,
            fail_connect: false,
            omit_uart_service: false,
            config: DeviceConfig {
                timeout_ms: 1000,
                pulse_count: 1,
                pulse_width_us: 100,
                pulse_interval_us: 0,
                mid_value: 0,
                recycle_us: 400,
                tail_us: 0,
                electrode_currents: [0; ELECTRODE_COUNT],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_defaults_for_empty_table() {
        let options: VirtualOptions = toml::from_str("").unwrap();
        assert_eq!(options, VirtualOptions::default());
        assert_eq!(options.name, "HowlandStim");
    }

    #[test]
    fn should_parse_partial_table() {
        let options: VirtualOptions = toml::from_str(
            r"
            rssi = -70
            fail_connect = true

            [config]
            timeout_ms = 500
            pulse_count = 0
            pulse_width_us = 0
            pulse_interval_us = 0
            mid_value = 0
            recycle_us = 0
            tail_us = 0
            electrode_currents = [3, -3, 0, 0, 0, 0, 0, 0]
            ",
        )
        .unwrap();
        assert_eq!(options.rssi, -70);
        assert!(options.fail_connect);
        assert_eq!(options.config.pulse_count, 0);
        assert_eq!(options.config.electrode_currents[1], -3);
        assert_eq!(options.advertise_interval_ms, 500);
    }
}
