//! Mapping of btleplug peripheral properties to scan results.

use btleplug::api::PeripheralProperties;

use stimlink_domain::id::PeripheralId;
use stimlink_domain::scan::ScannedPeripheral;

/// Build a [`ScannedPeripheral`] from what the stack knows about `id`.
///
/// Blank local names are treated as absent.
pub(crate) fn scanned(id: PeripheralId, properties: &PeripheralProperties) -> ScannedPeripheral {
    let name = properties
        .local_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);
    ScannedPeripheral {
        id,
        name,
        signal_strength: properties.rssi,
    }
}
