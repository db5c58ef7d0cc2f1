//! Firmware behaviour of the simulated stimulator.
//!
//! Mirrors what the real device does on its RX characteristic:
//!
//! | Written bytes | Reaction |
//! |---------------|----------|
//! | single byte `0` (handshake) | report the current configuration |
//! | 24-byte frame, command `0` | report the current configuration |
//! | 24-byte frame, command `2` | store the frame, then report it |
//! | anything else | ignored |

use std::sync::{Mutex, PoisonError};

use stimlink_domain::config::DeviceConfig;
use stimlink_domain::frame;
use stimlink_domain::protocol::{Command, FRAME_LEN};

/// Configuration memory plus the command interpreter.
pub(crate) struct Stimulator {
    config: Mutex<DeviceConfig>,
}

impl Stimulator {
    pub(crate) fn new(config: DeviceConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    pub(crate) fn config(&self) -> DeviceConfig {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle bytes written to RX; returns the frame to notify on TX, if any.
    pub(crate) fn receive(&self, bytes: &[u8]) -> Option<[u8; FRAME_LEN]> {
        let command = match bytes {
            [code] => Command::try_from(*code).ok()?,
            full if full.len() == FRAME_LEN => Command::try_from(full[0]).ok()?,
            _ => return None,
        };
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        if command == Command::SetConfig {
            if bytes.len() != FRAME_LEN {
                return None;
            }
            *config = frame::decode(bytes).ok()?;
            tracing::debug!("simulated stimulator stored a new configuration");
        }
        frame::encode(&config, Command::Query).ok()
    }
}
