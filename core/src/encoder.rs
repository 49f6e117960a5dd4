use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::framing::{build_header, build_packet, bytes_to_nibbles, PacketType};
use crate::frontend::{PlaybackDevice, ScheduledTone, ToneGenerator};
use crate::tones::tone_frequency;
use crate::{DATA_TIMEOUT, DEFAULT_TONE_GAIN, FADE_DURATION, PREAMBLE_FREQUENCY_HZ};
use log::{debug, info, warn};
use std::time::Duration;

/// What to send
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    /// Already-compressed image bytes (JPEG) plus their pixel size
    Image { width: u16, height: u16, data: Vec<u8> },
}

impl Payload {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Payload::Text(_) => PacketType::Text,
            Payload::Image { .. } => PacketType::Image,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Image { data, .. } => data,
        }
    }

    fn dimensions(&self) -> (u16, u16) {
        match self {
            Payload::Text(_) => (0, 0),
            Payload::Image { width, height, .. } => (*width, *height),
        }
    }
}

/// Tone schedule for one packet, relative to the transmission start
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionPlan {
    pub tones: Vec<ScheduledTone>,
    pub total: Duration,
    /// Nibbles carried by the data tones (header included)
    pub nibbles: Vec<u8>,
}

impl TransmissionPlan {
    /// Fraction of the schedule elapsed, clamped to [0, 1].
    ///
    /// Pure function of wall-clock time: progress displays may call it at any
    /// rate without touching protocol state.
    pub fn progress_at(&self, elapsed: Duration) -> f32 {
        if self.total.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.total.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    /// When the first data tone starts
    pub fn data_start(&self) -> Option<Duration> {
        self.tones.get(1).map(|tone| tone.start)
    }
}

/// Packet transmitter: preamble, guard gap, then one tone per nibble
pub struct Transmitter {
    config: ModemConfig,
    gain: f32,
}

impl Transmitter {
    pub fn new(config: ModemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gain: DEFAULT_TONE_GAIN,
        })
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Set the peak tone gain (clamped to 0.01..1.0)
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.01, 1.0);
    }

    /// Build the tone schedule without playing it
    pub fn plan(&self, payload: &Payload) -> Result<TransmissionPlan> {
        let data = payload.bytes();
        let payload_len =
            u32::try_from(data.len()).map_err(|_| ModemError::PayloadTooLarge(data.len()))?;
        let (width, height) = payload.dimensions();

        let header = build_header(payload.packet_type(), payload_len, width, height);
        let nibbles = bytes_to_nibbles(&build_packet(&header, data));

        let symbol = self.config.symbol_duration;
        let mut tones = Vec::with_capacity(nibbles.len() + 1);

        tones.push(ScheduledTone {
            frequency: PREAMBLE_FREQUENCY_HZ,
            start: Duration::ZERO,
            duration: self.config.preamble_duration(),
            gain: self.gain,
            ramp: FADE_DURATION,
        });

        let data_start = self.config.preamble_duration() + self.config.guard_gap();
        for (i, &nibble) in nibbles.iter().enumerate() {
            tones.push(ScheduledTone {
                frequency: tone_frequency(&self.config, nibble)?,
                start: data_start + symbol * i as u32,
                duration: self.config.tone_duration(),
                gain: self.gain,
                ramp: FADE_DURATION,
            });
        }

        let total = data_start + symbol * nibbles.len() as u32;
        if total - data_start > DATA_TIMEOUT {
            warn!(
                "Transmission of {} bytes takes {:.1}s of data, receivers time out after {}s",
                data.len(),
                (total - data_start).as_secs_f32(),
                DATA_TIMEOUT.as_secs()
            );
        }

        debug!(
            "Planned {} data tones after {:?} preamble, total {:?}",
            nibbles.len(),
            self.config.preamble_duration(),
            total
        );

        Ok(TransmissionPlan {
            tones,
            total,
            nibbles,
        })
    }

    /// Schedule every tone of `payload` on `generator`
    pub fn schedule<G: ToneGenerator>(&self, payload: &Payload, generator: &mut G) -> Result<TransmissionPlan> {
        let plan = self.plan(payload)?;
        self.schedule_plan(payload, &plan, generator)?;
        Ok(plan)
    }

    fn schedule_plan<G: ToneGenerator>(
        &self,
        payload: &Payload,
        plan: &TransmissionPlan,
        generator: &mut G,
    ) -> Result<()> {
        for tone in &plan.tones {
            generator.schedule_tone(tone)?;
        }
        info!(
            "Scheduled {:?} packet: {} bytes in {:.2}s",
            payload.packet_type(),
            payload.bytes().len(),
            plan.total.as_secs_f32()
        );
        Ok(())
    }

    /// Open `device` and schedule the packet on it.
    ///
    /// The device stays open; the caller releases it once `plan.total` has
    /// elapsed (or earlier to abandon the remaining tones). A tone the
    /// device rejects abandons the transmission and releases the device.
    pub fn send<D: PlaybackDevice>(&self, payload: &Payload, device: &mut D) -> Result<TransmissionPlan> {
        let plan = self.plan(payload)?;
        device.open()?;
        if let Err(err) = self.schedule_plan(payload, &plan, device) {
            warn!("Transmission abandoned: {}", err);
            device.close();
            return Err(err);
        }
        Ok(plan)
    }
}
