//! Virtual adapter error types.

use stimlink_domain::error::TransportError;
use stimlink_domain::id::PeripheralId;

/// Errors raised by the simulated radio.
#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// The id does not belong to the simulated stimulator.
    #[error("unknown peripheral {0}")]
    UnknownPeripheral(PeripheralId),

    /// The operation needs a connection and there is none.
    #[error("peripheral is not connected")]
    NotConnected,

    /// The simulation was configured to refuse connections.
    #[error("connection refused by simulated peripheral")]
    Refused,

    /// The addressed service/characteristic pair does not exist.
    #[error("characteristic {characteristic} not found in service {service}")]
    NoSuchCharacteristic {
        service: uuid::Uuid,
        characteristic: uuid::Uuid,
    },
}

impl VirtualError {
    /// Wrap into a [`TransportError`] naming the operation that failed.
    #[must_use]
    pub fn during(self, operation: &'static str) -> TransportError {
        TransportError::new(operation, self)
    }
}

impl From<VirtualError> for TransportError {
    fn from(err: VirtualError) -> Self {
        err.during("virtual radio")
    }
}
