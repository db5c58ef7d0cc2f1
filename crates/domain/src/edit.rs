//! Pending edit: the locally drafted configuration and its dirty flag.
//!
//! The edit only exists while a device is connected. It is reloaded from the
//! device configuration on every decode, on disconnect, and on discard, so
//! the device stays the single source of truth.

use crate::config::DeviceConfig;
use crate::error::ValidationError;
use crate::protocol::{ELECTRODE_COUNT, MAX_CURRENT_MA, MIN_CURRENT_MA};
use crate::selection::ConnectionState;

/// Smallest selectable pulse/recycle ratio.
pub const MIN_RECYCLE_RATIO: u8 = 2;
/// Largest selectable pulse/recycle ratio.
pub const MAX_RECYCLE_RATIO: u8 = 10;

const DEFAULT_PULSE_WIDTH: &str = "50";
const DEFAULT_RECYCLE_RATIO: u8 = 4;

/// Locally drafted configuration.
///
/// Nothing resets an edit behind the caller's back: whoever holds it calls
/// [`discard`](Self::discard) (or rebuilds it with
/// [`from_config`](Self::from_config)) after every configuration report and
/// after a disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    currents: [i16; ELECTRODE_COUNT],
    pulse_count: u16,
    pulse_width: String,
    recycle_ratio: u8,
    allow_zero_pulse: bool,
}

impl Default for PendingEdit {
    fn default() -> Self {
        Self {
            currents: [0; ELECTRODE_COUNT],
            pulse_count: 1,
            pulse_width: DEFAULT_PULSE_WIDTH.to_owned(),
            recycle_ratio: DEFAULT_RECYCLE_RATIO,
            allow_zero_pulse: false,
        }
    }
}

impl PendingEdit {
    /// Load an edit mirroring `config`.
    ///
    /// The ratio is derived from `recycle / width`, rounded and clamped to
    /// the selectable range. A device already running zero pulses unlocks
    /// the zero-pulse option.
    #[must_use]
    pub fn from_config(config: &DeviceConfig) -> Self {
        let mut edit = Self::default();
        edit.load(config);
        edit
    }

    /// Throw away local changes and mirror `config` again.
    ///
    /// A zero-pulse allowance granted earlier is kept.
    pub fn discard(&mut self, config: &DeviceConfig) {
        self.load(config);
    }

    fn load(&mut self, config: &DeviceConfig) {
        if config.pulse_count == 0 {
            self.allow_zero_pulse = true;
        }
        self.currents = config.electrode_currents;
        self.pulse_count = config.pulse_count;
        self.pulse_width = config.pulse_width_us.to_string();
        self.recycle_ratio = ratio_for(config.pulse_width_us, config.recycle_us);
    }

    #[must_use]
    pub fn currents(&self) -> &[i16; ELECTRODE_COUNT] {
        &self.currents
    }

    #[must_use]
    pub fn pulse_count(&self) -> u16 {
        self.pulse_count
    }

    /// Raw pulse width text, possibly empty.
    #[must_use]
    pub fn pulse_width_text(&self) -> &str {
        &self.pulse_width
    }

    /// Pulse width parsed from the text, if it is a valid number.
    #[must_use]
    pub fn pulse_width_us(&self) -> Option<u16> {
        self.pulse_width.parse().ok()
    }

    #[must_use]
    pub fn recycle_ratio(&self) -> u8 {
        self.recycle_ratio
    }

    #[must_use]
    pub fn allow_zero_pulse(&self) -> bool {
        self.allow_zero_pulse
    }

    /// Pulse counts currently offered.
    #[must_use]
    pub fn pulse_count_options(&self) -> &'static [u16] {
        const WITH_ZERO: &[u16] = &[0, 1];
        const PULSING: &[u16] = &[1];
        if self.allow_zero_pulse { WITH_ZERO } else { PULSING }
    }

    /// Set the current of one electrode.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownElectrode`] for an index past the
    /// last electrode, or [`ValidationError::CurrentOutOfRange`] when the
    /// value is outside [-15, 15] mA.
    pub fn set_current(&mut self, electrode: usize, value: i16) -> Result<(), ValidationError> {
        if !(MIN_CURRENT_MA..=MAX_CURRENT_MA).contains(&value) {
            return Err(ValidationError::CurrentOutOfRange {
                value,
                min: MIN_CURRENT_MA,
                max: MAX_CURRENT_MA,
            });
        }
        let slot = self
            .currents
            .get_mut(electrode)
            .ok_or(ValidationError::UnknownElectrode(electrode))?;
        *slot = value;
        Ok(())
    }

    /// Choose the number of pulses per cycle.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PulseCount`] for a count not listed in
    /// [`pulse_count_options`](Self::pulse_count_options).
    pub fn set_pulse_count(&mut self, count: u16) -> Result<(), ValidationError> {
        if !self.pulse_count_options().contains(&count) {
            return Err(ValidationError::PulseCount(count));
        }
        self.pulse_count = count;
        Ok(())
    }

    /// Unlock or lock the zero-pulse option.
    ///
    /// Locking while zero pulses are selected falls back to one pulse.
    pub fn set_allow_zero_pulse(&mut self, allow: bool) {
        self.allow_zero_pulse = allow;
        if !allow && self.pulse_count == 0 {
            self.pulse_count = 1;
        }
    }

    /// Update the pulse width from user text.
    ///
    /// An empty string clears the field. Anything that is not the plain
    /// decimal rendering of a 16-bit unsigned integer is rejected and the
    /// previous text is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PulseWidth`] when the text is rejected.
    pub fn set_pulse_width_text(&mut self, text: &str) -> Result<(), ValidationError> {
        if text.is_empty() {
            self.pulse_width.clear();
            return Ok(());
        }
        match text.parse::<u16>() {
            Ok(value) if value.to_string() == text => {
                self.pulse_width = text.to_owned();
                Ok(())
            }
            _ => Err(ValidationError::PulseWidth),
        }
    }

    /// Choose the pulse/recycle ratio.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RecycleRatio`] outside 2..=10.
    pub fn set_recycle_ratio(&mut self, ratio: u8) -> Result<(), ValidationError> {
        if !(MIN_RECYCLE_RATIO..=MAX_RECYCLE_RATIO).contains(&ratio) {
            return Err(ValidationError::RecycleRatio(ratio));
        }
        self.recycle_ratio = ratio;
        Ok(())
    }

    /// Recycle duration implied by the width and ratio, in µs.
    #[must_use]
    pub fn recycle_us(&self) -> Option<u32> {
        self.pulse_width_us()
            .map(|w| u32::from(w) * u32::from(self.recycle_ratio))
    }

    /// Full period (pulse plus recycle), in µs.
    #[must_use]
    pub fn period_us(&self) -> Option<u32> {
        self.pulse_width_us()
            .map(|w| u32::from(w) * (u32::from(self.recycle_ratio) + 1))
    }

    /// Stimulation frequency, in Hz.
    #[must_use]
    pub fn frequency_hz(&self) -> Option<f64> {
        self.period_us()
            .filter(|p| *p > 0)
            .map(|p| 1_000_000.0 / f64::from(p))
    }

    #[must_use]
    pub fn currents_all_zero(&self) -> bool {
        self.currents.iter().all(|c| *c == 0)
    }

    /// Whether sourced and sunk currents do not cancel out.
    #[must_use]
    pub fn currents_unbalanced(&self) -> bool {
        self.currents.iter().map(|c| i32::from(*c)).sum::<i32>() != 0
    }

    /// Whether the current settings deserve a warning before sending.
    #[must_use]
    pub fn current_warning(&self) -> bool {
        self.currents_all_zero() || self.currents_unbalanced()
    }

    /// Build the configuration to send, starting from the device's `base`.
    ///
    /// Fields the edit does not cover (timeout, interval, mid, tail) are
    /// taken from `base`. With zero pulses only the currents and the pulse
    /// count are changed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PulseWidth`] if the width text does not
    /// parse, or [`ValidationError::RecycleOverflow`] if the implied recycle
    /// duration does not fit in 16 bits.
    pub fn to_config(&self, base: &DeviceConfig) -> Result<DeviceConfig, ValidationError> {
        let mut config = DeviceConfig {
            pulse_count: self.pulse_count,
            electrode_currents: self.currents,
            ..*base
        };
        if self.pulse_count == 0 {
            return Ok(config);
        }

        let width = self.pulse_width_us().ok_or(ValidationError::PulseWidth)?;
        let recycle = u32::from(width) * u32::from(self.recycle_ratio);
        config.pulse_width_us = width;
        config.recycle_us =
            u16::try_from(recycle).map_err(|_| ValidationError::RecycleOverflow(recycle))?;
        Ok(config)
    }

    /// Whether this edit differs from the configuration the device reported.
    ///
    /// Never dirty with zero pulses selected: that mode sends no timing.
    #[must_use]
    pub fn differs_from(&self, config: &DeviceConfig) -> bool {
        if self.pulse_count == 0 {
            return false;
        }
        if self.currents != config.electrode_currents {
            return true;
        }
        if self.pulse_count != config.pulse_count {
            return true;
        }
        match self.pulse_width_us() {
            Some(width) => {
                width != config.pulse_width_us
                    || u32::from(width) * u32::from(self.recycle_ratio)
                        != u32::from(config.recycle_us)
            }
            None => true,
        }
    }
}

/// Whether `edit` holds unsent changes for the connected device.
///
/// Only a connected device with a known configuration can be dirty.
#[must_use]
pub fn is_dirty(state: &ConnectionState, edit: &PendingEdit) -> bool {
    match state {
        ConnectionState::Connected {
            config: Some(config),
            ..
        } => edit.differs_from(config),
        _ => false,
    }
}

fn ratio_for(width: u16, recycle: u16) -> u8 {
    if width == 0 {
        return if recycle > 0 {
            MAX_RECYCLE_RATIO
        } else {
            DEFAULT_RECYCLE_RATIO
        };
    }
    // Round half up in integer arithmetic.
    let rounded = (2 * u32::from(recycle) + u32::from(width)) / (2 * u32::from(width));
    let clamped = rounded.clamp(u32::from(MIN_RECYCLE_RATIO), u32::from(MAX_RECYCLE_RATIO));
    u8::try_from(clamped).unwrap_or(MAX_RECYCLE_RATIO)
}
