//! BLE adapter configuration.

use serde::Deserialize;

/// Configuration for the btleplug transport, read from the `[ble]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Which host adapter to use when several are present (0 = first).
    pub adapter_index: usize,
    /// Services a scan is restricted to when the caller asks for no filter.
    ///
    /// Empty means every advertisement is reported, which is what the
    /// stimulator needs: it does not advertise the UART service UUID.
    pub scan_services: Vec<uuid::Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_defaults_for_empty_table() {
        let config: BleConfig = toml::from_str("").unwrap();
        assert_eq!(config, BleConfig::default());
    }

    #[test]
    fn should_parse_adapter_and_service_filter() {
        let config: BleConfig = toml::from_str(
            r#"
            adapter_index = 1
            scan_services = ["6e400001-b5a3-f393-e0a9-e50e24dcca9e"]
            "#,
        )
        .unwrap();
        assert_eq!(config.adapter_index, 1);
        assert_eq!(
            config.scan_services,
            vec![stimlink_domain::protocol::UART_SERVICE]
        );
    }
}
