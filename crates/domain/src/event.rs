//! Session events and snapshots, what observers (UI, logs) get to see.

use serde::Serialize;

use crate::error::ErrorKind;
use crate::id::PeripheralId;
use crate::selection::ConnectionState;

/// Point-in-time view of the device session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    /// Latest polled signal strength of the connected peripheral, in dBm.
    pub signal_strength: Option<i16>,
}

/// Something observable that happened in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The connection state machine moved.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// A new signal-strength reading for the connected peripheral.
    SignalStrength { id: PeripheralId, rssi: i16 },
    /// An operation failed; the state machine has already settled.
    Failure { kind: ErrorKind, message: String },
}

impl SessionEvent {
    /// Build a [`SessionEvent::Failure`] from any stimlink error.
    #[must_use]
    pub fn failure(err: &crate::error::StimError) -> Self {
        Self::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
