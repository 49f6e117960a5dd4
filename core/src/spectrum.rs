use crate::error::{ModemError, Result};
use crate::frontend::{CaptureDevice, SpectrumSampler};
use crate::ANALYSIS_WINDOW_MS;
use std::f32::consts::PI;
use std::time::Duration;

/// Bins averaged on each side of a frequency's nearest bin
const NEIGHBOR_BINS: usize = 1;

/// Recorded mono audio exposed as a capture device.
///
/// Each snapshot analyses the 32 ms of audio ending at the current
/// position with a Hann window. A frequency's magnitude is the Goertzel
/// amplitude averaged over its nearest bin and one neighbour either side,
/// scaled so a full-scale sine reads about 0.67 and clamped to [0, 1].
pub struct RecordedSignal {
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
    window: Vec<f32>,
    window_sum: f32,
    frame: Vec<f32>,
}

impl RecordedSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let len = ((sample_rate as usize * ANALYSIS_WINDOW_MS as usize) / 1000).max(16);
        let window = hann_window(len);
        let window_sum = window.iter().sum();
        Self {
            samples,
            sample_rate,
            cursor: 0,
            window,
            window_sum,
            frame: vec![0.0; len],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        let nanos = (self.samples.len() as u64 * 1_000_000_000)
            .checked_div(self.sample_rate as u64)
            .unwrap_or(0);
        Duration::from_nanos(nanos)
    }

    /// Move the analysis position to `t` from the start of the recording
    pub fn seek(&mut self, t: Duration) {
        self.cursor = (t.as_secs_f64() * self.sample_rate as f64).round() as usize;
    }

    /// Windowed copy of the samples ending at the cursor; audio before the
    /// start of the recording reads as silence
    fn load_frame(&mut self) {
        let len = self.window.len();
        for (i, slot) in self.frame.iter_mut().enumerate() {
            let pos = (self.cursor + i).checked_sub(len);
            let sample = pos
                .and_then(|p| self.samples.get(p))
                .copied()
                .unwrap_or(0.0);
            *slot = sample * self.window[i];
        }
    }

    fn channel_magnitude(&self, frequency: f32) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        let n = self.frame.len();
        let center = (frequency * n as f32 / self.sample_rate as f32).round() as usize;
        let lo = center.saturating_sub(NEIGHBOR_BINS).max(1);
        let hi = (center + NEIGHBOR_BINS).min(n / 2 - 1);
        if lo > hi {
            return 0.0;
        }

        let total: f32 = (lo..=hi)
            .map(|k| 2.0 * goertzel_power(&self.frame, k).sqrt() / self.window_sum)
            .sum();
        (total / (hi - lo + 1) as f32).clamp(0.0, 1.0)
    }
}

impl SpectrumSampler for RecordedSignal {
    fn magnitudes(&mut self, frequencies: &[f32]) -> Vec<f32> {
        self.load_frame();
        frequencies
            .iter()
            .map(|&f| self.channel_magnitude(f))
            .collect()
    }
}

impl CaptureDevice for RecordedSignal {
    fn open(&mut self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ModemError::DeviceUnavailable(
                "recording has a zero sample rate".into(),
            ));
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.cursor = 0;
    }

    fn advance(&mut self, now: Duration) -> bool {
        if self.sample_rate == 0 {
            return false;
        }
        self.seek(now);
        self.cursor <= self.samples.len()
    }
}

/// Squared magnitude of DFT bin `k` via the Goertzel recurrence
fn goertzel_power(frame: &[f32], k: usize) -> f32 {
    let n = frame.len();
    let omega = 2.0 * PI * k as f32 / n as f32;
    let coeff = 2.0 * omega.cos();

    let mut q1 = 0.0;
    let mut q2 = 0.0;
    for &sample in frame {
        let q0 = coeff * q1 - q2 + sample;
        q2 = q1;
        q1 = q0;
    }

    (q1 * q1 + q2 * q2 - coeff * q1 * q2).max(0.0)
}

fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / len as f32).cos())
        .collect()
}
