use crate::error::{ModemError, Result};
use crate::frontend::{PlaybackDevice, ScheduledTone, ToneGenerator};
use std::f32::consts::PI;
use std::time::Duration;

/// Renders scheduled tones into a mono PCM buffer.
///
/// Stands in for a real output device: the buffer can be written to a WAV
/// file or fed straight back into a [`crate::RecordedSignal`].
pub struct ToneRenderer {
    sample_rate: u32,
    samples: Vec<f32>,
    open: bool,
}

impl ToneRenderer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Vec::new(),
            open: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Extend the buffer with silence up to `duration`
    pub fn pad_to(&mut self, duration: Duration) {
        let len = self.sample_index(duration);
        if len > self.samples.len() {
            self.samples.resize(len, 0.0);
        }
    }

    fn sample_index(&self, t: Duration) -> usize {
        (t.as_secs_f64() * self.sample_rate as f64).round() as usize
    }
}

impl ToneGenerator for ToneRenderer {
    fn schedule_tone(&mut self, tone: &ScheduledTone) -> Result<()> {
        let nyquist = self.sample_rate as f32 / 2.0;
        if tone.frequency <= 0.0 || tone.frequency >= nyquist {
            return Err(ModemError::InvalidConfig(format!(
                "tone {} Hz cannot be rendered at {} Hz sample rate",
                tone.frequency, self.sample_rate
            )));
        }

        let start = self.sample_index(tone.start);
        let len = self.sample_index(tone.duration);
        if start + len > self.samples.len() {
            self.samples.resize(start + len, 0.0);
        }

        let ramp = self.sample_index(tone.ramp).min(len / 2);
        let rate = self.sample_rate as f32;

        for n in 0..len {
            // Linear fade in and out to avoid clicks
            let envelope = if ramp == 0 {
                1.0
            } else {
                let from_edge = n.min(len - 1 - n);
                (from_edge as f32 / ramp as f32).min(1.0)
            };
            let t = n as f32 / rate;
            self.samples[start + n] += tone.gain * envelope * (2.0 * PI * tone.frequency * t).sin();
        }

        Ok(())
    }
}

impl PlaybackDevice for ToneRenderer {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(ModemError::SessionActive);
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}
