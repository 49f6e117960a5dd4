//! Seams to the audio hardware.
//!
//! Tone playback, microphone capture and spectral analysis live outside the
//! protocol. The modem only needs to schedule tones and to read one
//! normalized magnitude per frequency of interest.

use crate::error::Result;
use std::time::Duration;

/// A sine tone placed on the output timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTone {
    pub frequency: f32,
    /// Offset from the start of the transmission
    pub start: Duration,
    pub duration: Duration,
    /// Peak amplitude, 0..1
    pub gain: f32,
    /// Length of the linear fade-in and fade-out
    pub ramp: Duration,
}

impl ScheduledTone {
    pub fn end(&self) -> Duration {
        self.start + self.duration
    }

    /// Linear envelope value at `t` (relative to the transmission start)
    pub fn envelope_at(&self, t: Duration) -> f32 {
        if t < self.start || t >= self.end() {
            return 0.0;
        }
        let into = (t - self.start).as_secs_f32();
        let left = (self.end() - t).as_secs_f32();
        let ramp = self.ramp.as_secs_f32();
        if ramp <= 0.0 {
            return 1.0;
        }
        (into / ramp).min(left / ramp).min(1.0)
    }
}

pub trait ToneGenerator {
    fn schedule_tone(&mut self, tone: &ScheduledTone) -> Result<()>;
}

/// Output device; tones scheduled after `open` play without further attention
pub trait PlaybackDevice: ToneGenerator {
    fn open(&mut self) -> Result<()>;
    fn close(&mut self);
}

pub trait SpectrumSampler {
    /// One normalized [0, 1] magnitude per requested frequency, in order
    fn magnitudes(&mut self, frequencies: &[f32]) -> Vec<f32>;
}

/// Input device backing a receive session
pub trait CaptureDevice: SpectrumSampler {
    fn open(&mut self) -> Result<()>;
    fn close(&mut self);

    /// Move the analysis snapshot to `now` (time since the device opened).
    ///
    /// Live devices ignore the argument. Returns `false` once no further
    /// input will arrive.
    fn advance(&mut self, now: Duration) -> bool;
}
