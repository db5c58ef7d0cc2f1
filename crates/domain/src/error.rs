//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts via `#[from]`.
//! Adapters box their native errors into [`TransportError`].

use std::time::Duration;

use crate::id::PeripheralId;

/// Top-level error for scan, connection, and configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum StimError {
    /// The transport refused to start scanning.
    #[error("BLE scan could not be started")]
    ScanStartFailed(#[source] TransportError),

    /// The transport reported a failure while stopping the scan.
    #[error("BLE scan could not be stopped cleanly")]
    ScanStopFailed(#[source] TransportError),

    /// The transport refused the connection.
    #[error("connection to {id} failed")]
    ConnectFailed {
        /// Peripheral the connection was attempted on.
        id: PeripheralId,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The peripheral never exposed any GATT service.
    #[error("no GATT services discovered after {attempts} attempts")]
    ServiceDiscoveryTimeout {
        /// How many discovery rounds were made.
        attempts: u32,
    },

    /// The peripheral is reachable but is not a compatible device.
    #[error("required service {service} is missing (incompatible device)")]
    RequiredServiceMissing {
        /// The UUID that was looked for.
        service: uuid::Uuid,
    },

    /// Frame encode/decode failure.
    #[error("frame error")]
    Frame(#[from] FrameError),

    /// A pending edit could not be turned into a configuration.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A transport operation did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Name of the transport operation.
        operation: &'static str,
        /// Configured limit.
        after: Duration,
    },

    /// The link dropped without being asked to.
    #[error("peripheral disconnected unexpectedly")]
    UnexpectedDisconnect,

    /// The operation requires a connected peripheral.
    #[error("no peripheral is connected")]
    NotConnected,

    /// Any other transport failure.
    #[error("transport error")]
    Transport(#[from] TransportError),

    /// The device controller task is no longer running.
    #[error("device controller has shut down")]
    ControllerClosed,
}

/// Coarse classification of a [`StimError`], cheap to copy and broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ScanStartFailed,
    ScanStopFailed,
    ConnectFailed,
    ServiceDiscoveryTimeout,
    RequiredServiceMissing,
    MalformedFrame,
    OutOfRange,
    Validation,
    Timeout,
    UnexpectedDisconnect,
    NotConnected,
    Transport,
    ControllerClosed,
}

impl StimError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ScanStartFailed(_) => ErrorKind::ScanStartFailed,
            Self::ScanStopFailed(_) => ErrorKind::ScanStopFailed,
            Self::ConnectFailed { .. } => ErrorKind::ConnectFailed,
            Self::ServiceDiscoveryTimeout { .. } => ErrorKind::ServiceDiscoveryTimeout,
            Self::RequiredServiceMissing { .. } => ErrorKind::RequiredServiceMissing,
            Self::Frame(FrameError::MalformedFrame { .. }) => ErrorKind::MalformedFrame,
            Self::Frame(FrameError::OutOfRange { .. }) => ErrorKind::OutOfRange,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::UnexpectedDisconnect => ErrorKind::UnexpectedDisconnect,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Transport(_) => ErrorKind::Transport,
            Self::ControllerClosed => ErrorKind::ControllerClosed,
        }
    }

    /// Whether the user can simply try again.
    ///
    /// Everything except an incompatible device and a rejected configuration
    /// is transient.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::RequiredServiceMissing
                | ErrorKind::OutOfRange
                | ErrorKind::Validation
                | ErrorKind::ControllerClosed
        )
    }
}

/// Failures of the 24-byte frame codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The notification did not carry exactly one frame.
    #[error("frame must be 24 bytes, got {actual}")]
    MalformedFrame {
        /// Received length.
        actual: usize,
    },

    /// An electrode current does not fit in a signed byte.
    #[error("electrode {electrode} current {value} does not fit in a signed byte")]
    OutOfRange {
        /// Electrode index (0-based).
        electrode: usize,
        /// Offending value.
        value: i16,
    },
}

/// Rejected pending-edit input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Electrode index past the last electrode.
    #[error("electrode index {0} out of range")]
    UnknownElectrode(usize),

    /// Current outside the selectable range.
    #[error("current {value} mA outside [{min}, {max}]")]
    CurrentOutOfRange {
        /// Requested value.
        value: i16,
        /// Lower bound.
        min: i16,
        /// Upper bound.
        max: i16,
    },

    /// Pulse count not offered in the current mode.
    #[error("pulse count {0} not allowed")]
    PulseCount(u16),

    /// Pulse/recycle ratio outside 2..=10.
    #[error("pulse/recycle ratio {0} outside 2..=10")]
    RecycleRatio(u8),

    /// Pulse width text is empty or not a plain integer.
    #[error("pulse width is not a valid number")]
    PulseWidth,

    /// The derived recycle duration does not fit in 16 bits.
    #[error("recycle duration {0} µs does not fit in 16 bits")]
    RecycleOverflow(u32),
}

/// A transport (radio stack) operation failed.
///
/// Wraps the adapter's native error so the application layer does not need
/// to know which stack is underneath.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed")]
pub struct TransportError {
    operation: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    /// Wrap a native adapter error raised while running `operation`.
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// The transport operation that failed.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}
