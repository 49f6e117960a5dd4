use crate::error::{ModemError, Result};
use crate::{
    FADE_DURATION, GUARD_SYMBOLS, NUM_TONES, PREAMBLE_CONFIRM_SYMBOLS, PREAMBLE_FREQUENCY_HZ,
    PREAMBLE_SYMBOLS, TICKS_PER_SYMBOL, TONE_FILL_RATIO,
};
use std::time::Duration;

/// Smallest symbol duration that still leaves room for both fades
const MIN_SYMBOL_DURATION: Duration = Duration::from_millis(20);

/// Settings shared out-of-band by transmitter and receiver.
///
/// Nothing here is negotiated on the air: both ends must be configured
/// with identical values or the receiver decodes garbage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModemConfig {
    /// Length of one symbol slot
    pub symbol_duration: Duration,
    /// Frequency of symbol 0 in Hz
    pub base_frequency: f32,
    /// Distance between adjacent symbol tones in Hz
    pub spacing: f32,
    /// Normalized magnitude (0..1) a tone must exceed to count as present
    pub threshold: f32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            symbol_duration: Duration::from_millis(120),
            base_frequency: 1000.0,
            spacing: 200.0,
            threshold: 0.1,
        }
    }
}

impl ModemConfig {
    pub fn validate(&self) -> Result<()> {
        if self.symbol_duration < MIN_SYMBOL_DURATION {
            return Err(ModemError::InvalidConfig(format!(
                "symbol duration {:?} is below the {:?} minimum",
                self.symbol_duration, MIN_SYMBOL_DURATION
            )));
        }
        if !(self.base_frequency > 0.0) {
            return Err(ModemError::InvalidConfig(format!(
                "base frequency must be positive, got {}",
                self.base_frequency
            )));
        }
        if !(self.spacing > 0.0) {
            return Err(ModemError::InvalidConfig(format!(
                "frequency spacing must be positive, got {}",
                self.spacing
            )));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ModemError::InvalidConfig(format!(
                "threshold must lie in (0, 1), got {}",
                self.threshold
            )));
        }

        // The preamble must stay at least one spacing clear of the data band
        let below = PREAMBLE_FREQUENCY_HZ <= self.base_frequency - self.spacing;
        let above = PREAMBLE_FREQUENCY_HZ >= self.highest_frequency() + self.spacing;
        if !below && !above {
            return Err(ModemError::InvalidConfig(format!(
                "preamble tone {} Hz overlaps data band {}..{} Hz",
                PREAMBLE_FREQUENCY_HZ,
                self.base_frequency,
                self.highest_frequency()
            )));
        }

        Ok(())
    }

    /// Frequency of symbol 15
    pub fn highest_frequency(&self) -> f32 {
        self.base_frequency + (NUM_TONES - 1) as f32 * self.spacing
    }

    /// Interval of the receiver's sampling clock
    pub fn tick_interval(&self) -> Duration {
        self.symbol_duration / TICKS_PER_SYMBOL
    }

    /// Audible part of a data symbol; the rest of the slot is silence
    pub fn tone_duration(&self) -> Duration {
        self.symbol_duration
            .mul_f64(TONE_FILL_RATIO)
            .max(FADE_DURATION * 2)
    }

    pub fn preamble_duration(&self) -> Duration {
        self.symbol_duration * PREAMBLE_SYMBOLS
    }

    /// How long the preamble tone must be held before sync is confirmed
    pub fn preamble_confirm_duration(&self) -> Duration {
        self.symbol_duration * PREAMBLE_CONFIRM_SYMBOLS
    }

    /// Part of the preamble still sounding when the receiver confirms it
    pub fn preamble_tail(&self) -> Duration {
        self.preamble_duration() - self.preamble_confirm_duration()
    }

    pub fn guard_gap(&self) -> Duration {
        self.symbol_duration * GUARD_SYMBOLS
    }
}
