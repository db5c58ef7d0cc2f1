//! Timing knobs of a device session.

use std::time::Duration;

/// Timeouts and intervals applied by the connection session and controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Limit for the transport `connect` call (and each discovery round).
    pub connect_timeout: Duration,
    /// Pause between two empty service-discovery rounds.
    pub discovery_backoff: Duration,
    /// Discovery rounds before giving up with `ServiceDiscoveryTimeout`.
    pub discovery_max_attempts: u32,
    /// Limit for a single characteristic write or subscription.
    pub write_timeout: Duration,
    /// Limit for an explicit disconnect.
    pub disconnect_timeout: Duration,
    /// Period of signal-strength polling while connected.
    pub signal_poll_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            discovery_backoff: Duration::from_millis(200),
            discovery_max_attempts: 25,
            write_timeout: Duration::from_secs(5),
            disconnect_timeout: Duration::from_secs(5),
            signal_poll_interval: Duration::from_secs(2),
        }
    }
}
