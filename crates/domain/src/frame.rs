//! 24-byte configuration frame codec.
//!
//! Pure functions operating on raw `&[u8]` slices; no BLE dependency needed.
//! The same layout is used in both directions:
//!
//! | Offset | Field | Type |
//! |--------|-------|------|
//! | 0 | Command (outgoing) / counter (incoming) | u8 |
//! | 1 | Reserved | u8 |
//! | 2–3 | Timeout | u16 LE, ms |
//! | 4–5 | Pulse count | u16 LE |
//! | 6–7 | Pulse width | u16 LE, µs |
//! | 8–9 | Pulse interval | u16 LE, µs |
//! | 10–11 | Mid value | u16 LE |
//! | 12–13 | Recycle | u16 LE, µs |
//! | 14–15 | Tail | u16 LE, µs |
//! | 16–23 | Electrode currents A–H | i8 each, mA |

use crate::config::DeviceConfig;
use crate::error::FrameError;
use crate::protocol::{Command, ELECTRODE_COUNT, FRAME_LEN};

const CURRENTS_OFFSET: usize = 16;

/// Decode a notification payload into a [`DeviceConfig`].
///
/// Byte 0 is not part of the configuration and is ignored.
///
/// # Errors
///
/// Returns [`FrameError::MalformedFrame`] when `data` is not exactly
/// 24 bytes long. No partial configuration is ever produced.
pub fn decode(data: &[u8]) -> Result<DeviceConfig, FrameError> {
    if data.len() != FRAME_LEN {
        return Err(FrameError::MalformedFrame { actual: data.len() });
    }

    let word = |offset: usize| u16::from_le_bytes([data[offset], data[offset + 1]]);

    let mut electrode_currents = [0i16; ELECTRODE_COUNT];
    for (slot, byte) in electrode_currents
        .iter_mut()
        .zip(&data[CURRENTS_OFFSET..FRAME_LEN])
    {
        *slot = i16::from(i8::from_le_bytes([*byte]));
    }

    Ok(DeviceConfig {
        timeout_ms: word(2),
        pulse_count: word(4),
        pulse_width_us: word(6),
        pulse_interval_us: word(8),
        mid_value: word(10),
        recycle_us: word(12),
        tail_us: word(14),
        electrode_currents,
    })
}

/// Encode a configuration into an outgoing frame tagged with `command`.
///
/// # Errors
///
/// Returns [`FrameError::OutOfRange`] when an electrode current does not
/// fit in a signed byte. Nothing is encoded in that case.
pub fn encode(config: &DeviceConfig, command: Command) -> Result<[u8; FRAME_LEN], FrameError> {
    let mut currents = [0u8; ELECTRODE_COUNT];
    for (electrode, (slot, value)) in currents
        .iter_mut()
        .zip(config.electrode_currents)
        .enumerate()
    {
        let narrow =
            i8::try_from(value).map_err(|_| FrameError::OutOfRange { electrode, value })?;
        *slot = narrow.to_le_bytes()[0];
    }

    let mut frame = [0u8; FRAME_LEN];
    frame[0] = command.code();

    let words = [
        config.timeout_ms,
        config.pulse_count,
        config.pulse_width_us,
        config.pulse_interval_us,
        config.mid_value,
        config.recycle_us,
        config.tail_us,
    ];
    for (i, value) in words.into_iter().enumerate() {
        let offset = 2 + i * 2;
        frame[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }
    frame[CURRENTS_OFFSET..].copy_from_slice(&currents);

    Ok(frame)
}

/// The one-byte query written right after subscribing, asking the device to
/// announce its current configuration.
#[must_use]
pub fn handshake() -> [u8; 1] {
    [Command::Query.code()]
}
