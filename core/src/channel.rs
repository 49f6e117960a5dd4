use crate::encoder::TransmissionPlan;
use crate::error::Result;
use crate::frontend::{CaptureDevice, ScheduledTone, SpectrumSampler};
use std::time::Duration;

/// Frequencies closer than this are the same channel
const MATCH_TOLERANCE_HZ: f32 = 0.5;

/// Noiseless loopback at the tone level.
///
/// Answers magnitude queries straight from scheduled tones, skipping audio
/// synthesis and spectral analysis: a sounding tone reads as its envelope
/// (1.0 once faded in), everything else reads 0.
#[derive(Debug, Clone, Default)]
pub struct ToneChannel {
    tones: Vec<ScheduledTone>,
    now: Duration,
    tail: Duration,
}

impl ToneChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Silence kept after the last tone before the channel reports exhaustion
    pub fn with_tail(mut self, tail: Duration) -> Self {
        self.tail = tail;
        self
    }

    /// Put a transmission on the air starting at `at` on the receiver clock
    pub fn transmit(&mut self, plan: &TransmissionPlan, at: Duration) {
        self.tones.extend(plan.tones.iter().map(|tone| ScheduledTone {
            start: tone.start + at,
            ..*tone
        }));
    }

    pub fn set_now(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn end(&self) -> Duration {
        self.tones
            .iter()
            .map(ScheduledTone::end)
            .max()
            .unwrap_or(Duration::ZERO)
            + self.tail
    }
}

impl SpectrumSampler for ToneChannel {
    fn magnitudes(&mut self, frequencies: &[f32]) -> Vec<f32> {
        frequencies
            .iter()
            .map(|&f| {
                self.tones
                    .iter()
                    .filter(|tone| (tone.frequency - f).abs() < MATCH_TOLERANCE_HZ)
                    .map(|tone| tone.envelope_at(self.now))
                    .fold(0.0, f32::max)
            })
            .collect()
    }
}

impl CaptureDevice for ToneChannel {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {}

    fn advance(&mut self, now: Duration) -> bool {
        self.now = now;
        now <= self.end()
    }
}
