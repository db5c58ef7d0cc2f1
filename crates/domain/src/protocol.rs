//! HowlandStim GATT layout and frame constants.
//!
//! The device exposes a Nordic-UART-style service: the app writes frames to
//! the RX characteristic and receives frames as TX notifications.

/// Local name advertised by the stimulator.
pub const TARGET_NAME: &str = "HowlandStim";

/// UART-like primary service.
pub const UART_SERVICE: uuid::Uuid = uuid::Uuid::from_u128(0x6e40_0001_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// RX characteristic (app → device, write).
pub const RX_CHAR: uuid::Uuid = uuid::Uuid::from_u128(0x6e40_0002_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// TX characteristic (device → app, notify).
pub const TX_CHAR: uuid::Uuid = uuid::Uuid::from_u128(0x6e40_0003_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// Length of a configuration frame, in both directions.
pub const FRAME_LEN: usize = 24;

/// Number of electrodes driven by the device.
pub const ELECTRODE_COUNT: usize = 8;

/// Smallest electrode current selectable in the UI, in mA.
pub const MIN_CURRENT_MA: i16 = -15;

/// Largest electrode current selectable in the UI, in mA.
pub const MAX_CURRENT_MA: i16 = 15;

/// Command discriminator carried in byte 0 of an outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Ask the device to announce its current configuration.
    Query = 0,
    /// Replace the device configuration with the frame contents.
    SetConfig = 2,
}

impl Command {
    /// Raw byte value.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Query),
            2 => Ok(Self::SetConfig),
            other => Err(other),
        }
    }
}
