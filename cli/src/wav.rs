//! WAV files as playback and capture devices.

use crate::error::CliError;
use hound::{SampleFormat, WavSpec};
use log::debug;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tonelink_core::{
    CaptureDevice, ModemError, PlaybackDevice, RecordedSignal, ScheduledTone, SpectrumSampler,
    ToneGenerator, ToneRenderer,
};

/// Silence written before the first tone
pub const LEAD_SILENCE: Duration = Duration::from_millis(250);
/// Silence written after the last tone
pub const TRAIL_SILENCE: Duration = Duration::from_millis(500);

/// Write mono samples as 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), CliError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let file = File::create(path).map_err(|e| CliError::io(path, e))?;
    let mut writer = hound::WavWriter::new(file, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a WAV file as mono f32 samples, averaging channels
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, u32), CliError> {
    let file = File::open(path).map_err(|e| CliError::io(path, e))?;
    let mut reader = hound::WavReader::new(std::io::BufReader::new(file))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(CliError::UnsupportedFormat("zero sample rate".into()));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / 8_388_608.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(CliError::UnsupportedFormat(format!(
                "{:?} with {} bits per sample",
                format, bits
            )))
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    debug!(
        "Read {} samples at {} Hz ({} channels) from {}",
        samples.len(),
        spec.sample_rate,
        spec.channels,
        path.display()
    );
    Ok((samples, spec.sample_rate))
}

/// Playback device that renders into memory and is written out as a WAV
pub struct WavPlayback {
    renderer: ToneRenderer,
}

impl WavPlayback {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            renderer: ToneRenderer::new(sample_rate),
        }
    }

    /// Write the rendered transmission, padded to `total` plus trailing silence
    pub fn write(mut self, path: &Path, total: Duration) -> Result<Duration, CliError> {
        self.renderer.pad_to(LEAD_SILENCE + total + TRAIL_SILENCE);
        let sample_rate = self.renderer.sample_rate();
        let samples = self.renderer.into_samples();
        write_wav(path, &samples, sample_rate)?;
        Ok(Duration::from_nanos(
            samples.len() as u64 * 1_000_000_000 / sample_rate as u64,
        ))
    }
}

impl ToneGenerator for WavPlayback {
    fn schedule_tone(&mut self, tone: &ScheduledTone) -> tonelink_core::Result<()> {
        self.renderer.schedule_tone(&ScheduledTone {
            start: tone.start + LEAD_SILENCE,
            ..*tone
        })
    }
}

impl PlaybackDevice for WavPlayback {
    fn open(&mut self) -> tonelink_core::Result<()> {
        self.renderer.open()
    }

    fn close(&mut self) {
        self.renderer.close();
    }
}

/// Capture device reading a WAV file when opened
pub struct WavCapture {
    path: PathBuf,
    signal: Option<RecordedSignal>,
}

impl WavCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            signal: None,
        }
    }
}

impl SpectrumSampler for WavCapture {
    fn magnitudes(&mut self, frequencies: &[f32]) -> Vec<f32> {
        match self.signal.as_mut() {
            Some(signal) => signal.magnitudes(frequencies),
            None => vec![0.0; frequencies.len()],
        }
    }
}

impl CaptureDevice for WavCapture {
    fn open(&mut self) -> tonelink_core::Result<()> {
        let (samples, sample_rate) = read_wav(&self.path)
            .map_err(|e| ModemError::DeviceUnavailable(e.to_string()))?;
        let mut signal = RecordedSignal::new(samples, sample_rate);
        signal.open()?;
        self.signal = Some(signal);
        Ok(())
    }

    fn close(&mut self) {
        self.signal = None;
    }

    fn advance(&mut self, now: Duration) -> bool {
        self.signal
            .as_mut()
            .map_or(false, |signal| signal.advance(now))
    }
}
