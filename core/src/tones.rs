use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::NUM_TONES;

/// Frequency for a symbol: `base + symbol * spacing`
///
/// Always derived from the config passed in, never cached, so a changed
/// configuration takes effect on the next lookup.
pub fn tone_frequency(config: &ModemConfig, symbol: u8) -> Result<f32> {
    if symbol as usize >= NUM_TONES {
        return Err(ModemError::InvalidSymbol(symbol));
    }
    Ok(config.base_frequency + symbol as f32 * config.spacing)
}

/// All 16 data tones in symbol order
pub fn tone_table(config: &ModemConfig) -> [f32; NUM_TONES] {
    let mut table = [0.0; NUM_TONES];
    for (i, freq) in table.iter_mut().enumerate() {
        *freq = config.base_frequency + i as f32 * config.spacing;
    }
    table
}
