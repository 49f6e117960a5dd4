//! Acoustic data modem: carries text and image payloads over audio tones
//!
//! Each nibble of a packet is sent as one of 16 tones, preceded by a
//! sustained out-of-band preamble tone. The receiver is a polled state
//! machine (IDLE → SYNC → DATA) that majority-votes several spectral
//! snapshots per symbol window.

pub mod error;
pub mod config;
pub mod framing;
pub mod tones;
pub mod frontend;
pub mod detector;
pub mod encoder;
pub mod events;
pub mod receiver;
pub mod listener;
pub mod render;
pub mod spectrum;
pub mod channel;

pub use channel::ToneChannel;
pub use config::ModemConfig;
pub use encoder::{Payload, TransmissionPlan, Transmitter};
pub use frontend::{CaptureDevice, PlaybackDevice, ScheduledTone, SpectrumSampler, ToneGenerator};
pub use error::{DecodeError, ModemError, Result};
pub use events::{LogSink, Packet, ReceiverEvent, StatusSink};
pub use framing::{Header, PacketType};
pub use listener::Listener;
pub use receiver::{ReceiverSession, ReceiverState};
pub use render::ToneRenderer;
pub use spectrum::RecordedSignal;

use std::time::Duration;

// Wire format
pub const MAGIC: [u8; 4] = [0x41, 0x43, 0x53, 0x54]; // "ACST"
pub const HEADER_SIZE: usize = 16;
pub const HEADER_NIBBLES: usize = HEADER_SIZE * 2; // 32
pub const NUM_TONES: usize = 16;

// Preamble: one sustained tone below the data band
pub const PREAMBLE_FREQUENCY_HZ: f32 = 600.0;
pub const PREAMBLE_SYMBOLS: u32 = 3;
pub const PREAMBLE_CONFIRM_SYMBOLS: u32 = 1;
pub const GUARD_SYMBOLS: u32 = 1;

// Tone shaping
pub const TONE_FILL_RATIO: f64 = 0.85;
pub const FADE_DURATION: Duration = Duration::from_millis(5);
pub const DEFAULT_TONE_GAIN: f32 = 0.5;

// Receiver timing
pub const TICKS_PER_SYMBOL: u32 = 5;
pub const DATA_TIMEOUT: Duration = Duration::from_secs(45);
pub const SILENCE_FINALIZE_WINDOWS: u32 = 5;
pub const SILENCE_ABANDON_WINDOWS: u32 = 12;
pub const COOLDOWN: Duration = Duration::from_millis(1500);

// Reference audio front end
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;
pub const ANALYSIS_WINDOW_MS: u32 = 32;
