//! Stateless symbol detection over magnitude snapshots

use crate::NUM_TONES;

/// Result of classifying one snapshot of the 16 data channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolReading {
    pub symbol: u8,
    pub magnitude: f32,
    pub magnitudes: [f32; NUM_TONES],
}

/// Pick the strongest data channel.
///
/// Ties go to the lowest symbol index. Missing channels (a short slice)
/// read as zero.
pub fn detect_symbol(magnitudes: &[f32]) -> SymbolReading {
    let mut channels = [0.0f32; NUM_TONES];
    for (slot, &value) in channels.iter_mut().zip(magnitudes) {
        *slot = value;
    }

    let mut best = 0usize;
    for (i, &value) in channels.iter().enumerate().skip(1) {
        // strict comparison keeps the lowest index on ties
        if value > channels[best] {
            best = i;
        }
    }

    SymbolReading {
        symbol: best as u8,
        magnitude: channels[best],
        magnitudes: channels,
    }
}

/// Preamble strength from a snapshot taken at the preamble frequency
pub fn preamble_magnitude(magnitudes: &[f32]) -> f32 {
    magnitudes.first().copied().unwrap_or(0.0)
}
