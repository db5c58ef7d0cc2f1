//! BLE adapter error types.

use stimlink_domain::error::TransportError;
use stimlink_domain::id::PeripheralId;

/// Errors specific to the BLE adapter.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// No BLE adapter found on the host.
    #[error("no BLE adapter available")]
    NotAvailable,

    /// The underlying btleplug call failed.
    #[error("BLE stack error")]
    Btle(#[from] btleplug::Error),

    /// The radio does not know a peripheral with this id (anymore).
    #[error("unknown peripheral {0}")]
    UnknownPeripheral(PeripheralId),

    /// A required GATT characteristic is missing on the peripheral.
    #[error("characteristic {uuid} not found")]
    CharacteristicNotFound {
        /// The characteristic UUID that was looked for.
        uuid: uuid::Uuid,
    },

    /// The stack reported no RSSI for a connected peripheral.
    #[error("no signal strength reported")]
    NoSignalStrength,
}

impl BleError {
    /// Wrap into a [`TransportError`] naming the operation that failed.
    #[must_use]
    pub fn during(self, operation: &'static str) -> TransportError {
        TransportError::new(operation, self)
    }
}

impl From<BleError> for TransportError {
    fn from(err: BleError) -> Self {
        err.during("bluetooth")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_available_error() {
        let err = BleError::NotAvailable;
        assert_eq!(err.to_string(), "no BLE adapter available");
    }

    #[test]
    fn should_display_stack_error() {
        let err = BleError::Btle(btleplug::Error::DeviceNotFound);
        assert_eq!(err.to_string(), "BLE stack error");
    }

    #[test]
    fn should_display_missing_characteristic() {
        let uuid = stimlink_domain::protocol::RX_CHAR;
        let err = BleError::CharacteristicNotFound { uuid };
        assert_eq!(
            err.to_string(),
            "characteristic 6e400002-b5a3-f393-e0a9-e50e24dcca9e not found"
        );
    }

    #[test]
    fn should_name_operation_when_converted() {
        let err = BleError::UnknownPeripheral(PeripheralId::new("dev1")).during("connect");
        assert_eq!(err.operation(), "connect");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "unknown peripheral dev1");
    }

    #[test]
    fn should_convert_with_generic_operation() {
        let err: TransportError = BleError::NoSignalStrength.into();
        assert_eq!(err.to_string(), "bluetooth failed");
    }
}
