//! Receive-side state machine.
//!
//! A session is advanced one step per tick of the sampling clock:
//!
//! ```text
//! IDLE ──preamble held one symbol──▶ SYNC ──dataStartAt reached──▶ DATA
//! DATA ──declared length / trailing silence──▶ finalize ──▶ IDLE
//! DATA ──no symbols at all (false sync)──────────────────▶ IDLE
//! DATA ──45 s ceiling────────────────────────────────────▶ IDLE
//! ```
//!
//! SYNC is left purely on time. Waiting for the preamble magnitude to drop
//! instead stalls forever in reverberant rooms, where echoes keep the level
//! above threshold.

use crate::config::ModemConfig;
use crate::detector::{detect_symbol, preamble_magnitude};
use crate::error::DecodeError;
use crate::events::{Packet, ReceiverEvent, StatusSink};
use crate::framing::{nibbles_to_bytes, parse_header, PacketType};
use crate::frontend::SpectrumSampler;
use crate::tones::tone_table;
use crate::{
    COOLDOWN, DATA_TIMEOUT, HEADER_NIBBLES, HEADER_SIZE, NUM_TONES, PREAMBLE_FREQUENCY_HZ,
    SILENCE_ABANDON_WINDOWS, SILENCE_FINALIZE_WINDOWS,
};
use log::{debug, info, warn};
use std::time::Duration;

/// Consecutive below-threshold ticks tolerated while timing the preamble
const PREAMBLE_DROPOUT_TICKS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Idle,
    Sync,
    Data,
}

/// Most frequent symbol among the valid samples of a window.
///
/// `None` entries are ticks without a tone above threshold. Ties go to the
/// lowest symbol; an all-`None` window yields `None`.
pub fn majority_vote(samples: &[Option<u8>]) -> Option<u8> {
    let mut counts = [0u32; NUM_TONES];
    for &symbol in samples.iter().flatten() {
        if let Some(count) = counts.get_mut(symbol as usize) {
            *count += 1;
        }
    }

    let mut best = None;
    let mut best_count = 0;
    for (symbol, &count) in counts.iter().enumerate() {
        if count > best_count {
            best = Some(symbol as u8);
            best_count = count;
        }
    }
    best
}

/// State of one listening session.
///
/// Owned by the caller and advanced with [`ReceiverSession::tick`]; nothing
/// here is shared or global.
#[derive(Debug, Clone)]
pub struct ReceiverSession {
    config: ModemConfig,
    state: ReceiverState,
    nibbles: Vec<u8>,
    window: Vec<Option<u8>>,
    silent_windows: u32,
    preamble_since: Option<Duration>,
    preamble_misses: u32,
    data_start_at: Duration,
    data_phase_start: Duration,
    window_start: Duration,
    expected_nibbles: Option<usize>,
    cooldown_until: Option<Duration>,
}

impl ReceiverSession {
    pub fn new(config: ModemConfig) -> Self {
        Self {
            config,
            state: ReceiverState::Idle,
            nibbles: Vec::new(),
            window: Vec::new(),
            silent_windows: 0,
            preamble_since: None,
            preamble_misses: 0,
            data_start_at: Duration::ZERO,
            data_phase_start: Duration::ZERO,
            window_start: Duration::ZERO,
            expected_nibbles: None,
            cooldown_until: None,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Configuration the session is currently decoding with
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn nibbles(&self) -> &[u8] {
        &self.nibbles
    }

    /// Packet size in nibbles once a valid header has been seen
    pub fn expected_nibbles(&self) -> Option<usize> {
        self.expected_nibbles
    }

    /// Advance the machine by one step.
    ///
    /// `config` is the caller's current snapshot. It takes effect while IDLE
    /// or at the next DATA window boundary, never in the middle of a window.
    pub fn tick<S, K>(&mut self, config: &ModemConfig, now: Duration, sampler: &mut S, sink: &mut K)
    where
        S: SpectrumSampler + ?Sized,
        K: StatusSink + ?Sized,
    {
        match self.state {
            ReceiverState::Idle => {
                self.adopt_config(config);
                self.tick_idle(now, sampler, sink);
            }
            ReceiverState::Sync => self.tick_sync(now, sink),
            ReceiverState::Data => self.tick_data(config, now, sampler, sink),
        }
    }

    fn adopt_config(&mut self, config: &ModemConfig) {
        if *config == self.config {
            return;
        }
        match config.validate() {
            Ok(()) => {
                debug!("Receiver adopting new configuration {:?}", config);
                self.config = *config;
            }
            Err(err) => debug!("Ignoring configuration update: {}", err),
        }
    }

    fn tick_idle<S, K>(&mut self, now: Duration, sampler: &mut S, sink: &mut K)
    where
        S: SpectrumSampler + ?Sized,
        K: StatusSink + ?Sized,
    {
        if let Some(at) = self.cooldown_until {
            if now >= at {
                self.cooldown_until = None;
                sink.emit(ReceiverEvent::WaitingForPreamble);
            }
        }

        let level = preamble_magnitude(&sampler.magnitudes(&[PREAMBLE_FREQUENCY_HZ]));

        if level > self.config.threshold {
            self.preamble_misses = 0;
            let since = *self.preamble_since.get_or_insert(now);
            if now.saturating_sub(since) >= self.config.preamble_confirm_duration() {
                self.confirm_sync(now, sink);
            }
        } else if self.preamble_since.is_some() {
            // Tolerate a brief dropout before throwing the timing away
            self.preamble_misses += 1;
            if self.preamble_misses > PREAMBLE_DROPOUT_TICKS {
                self.preamble_since = None;
                self.preamble_misses = 0;
            }
        }
    }

    fn confirm_sync<K: StatusSink + ?Sized>(&mut self, now: Duration, sink: &mut K) {
        self.state = ReceiverState::Sync;
        self.preamble_since = None;
        self.preamble_misses = 0;
        self.cooldown_until = None;
        self.data_start_at = now + self.config.preamble_tail() + self.config.guard_gap();

        info!(
            "Preamble confirmed at {:?}, data expected at {:?}",
            now, self.data_start_at
        );
        sink.emit(ReceiverEvent::PreambleDetected);
    }

    fn tick_sync<K: StatusSink + ?Sized>(&mut self, now: Duration, sink: &mut K) {
        if now < self.data_start_at {
            return;
        }

        self.state = ReceiverState::Data;
        self.nibbles.clear();
        self.window.clear();
        self.silent_windows = 0;
        self.expected_nibbles = None;
        self.data_phase_start = now;
        // Window 0 loses this tick's sample; every later window's first
        // sample lands on the leading edge of its symbol
        self.window_start = self
            .data_start_at
            .saturating_sub(self.config.tick_interval());

        debug!("Entering DATA at {:?}", now);
        sink.emit(ReceiverEvent::ReceivingData);
    }

    fn tick_data<S, K>(&mut self, config: &ModemConfig, now: Duration, sampler: &mut S, sink: &mut K)
    where
        S: SpectrumSampler + ?Sized,
        K: StatusSink + ?Sized,
    {
        if now.saturating_sub(self.data_phase_start) > DATA_TIMEOUT {
            warn!(
                "No complete packet after {}s ({} nibbles), giving up",
                DATA_TIMEOUT.as_secs(),
                self.nibbles.len()
            );
            sink.emit(ReceiverEvent::Failed(DecodeError::Timeout));
            self.reset();
            self.cooldown_until = Some(now + COOLDOWN);
            return;
        }

        let frequencies = tone_table(&self.config);
        let reading = detect_symbol(&sampler.magnitudes(&frequencies));
        if reading.magnitude > self.config.threshold {
            self.window.push(Some(reading.symbol));
            self.silent_windows = 0;
        } else {
            self.window.push(None);
        }

        if now.saturating_sub(self.window_start) >= self.config.symbol_duration {
            self.close_window(now, sink);
            if self.state == ReceiverState::Data {
                self.adopt_config(config);
            }
        }
    }

    fn close_window<K: StatusSink + ?Sized>(&mut self, now: Duration, sink: &mut K) {
        let vote = majority_vote(&self.window);
        debug!("Window closed with {:?} -> {:?}", self.window, vote);

        self.window.clear();
        self.window_start += self.config.symbol_duration;
        if now.saturating_sub(self.window_start) >= self.config.symbol_duration {
            // Clock stalled for more than a window; re-anchor on the present
            self.window_start = now;
        }

        match vote {
            Some(symbol) => {
                self.nibbles.push(symbol);
                self.silent_windows = 0;
                self.track_progress(sink);

                if let Some(expected) = self.expected_nibbles {
                    if self.nibbles.len() >= expected {
                        self.finalize(now, sink);
                    }
                }
            }
            None => {
                self.silent_windows += 1;
                if self.silent_windows >= SILENCE_FINALIZE_WINDOWS
                    && self.nibbles.len() >= HEADER_NIBBLES
                {
                    debug!("Trailing silence, finalizing {} nibbles", self.nibbles.len());
                    self.finalize(now, sink);
                } else if self.silent_windows >= SILENCE_ABANDON_WINDOWS {
                    if self.nibbles.is_empty() {
                        info!("No data after sync, treating preamble as false positive");
                        self.reset();
                        sink.emit(ReceiverEvent::Listening);
                    } else {
                        self.finalize(now, sink);
                    }
                }
            }
        }
    }

    fn track_progress<K: StatusSink + ?Sized>(&mut self, sink: &mut K) {
        if self.nibbles.len() == HEADER_NIBBLES {
            if let Some(header) = parse_header(&nibbles_to_bytes(&self.nibbles)) {
                debug!("Header received: {:?}", header);
                self.expected_nibbles = Some(header.packet_nibbles());
            }
        }

        if let Some(expected) = self.expected_nibbles {
            let received = self.nibbles.len().min(expected);
            sink.emit(ReceiverEvent::Progress {
                received_bytes: received / 2,
                expected_bytes: expected / 2,
                percent: received as f32 * 100.0 / expected as f32,
            });
        }
    }

    /// Decode whatever has been accumulated, report it, and return to IDLE
    pub fn finalize<K: StatusSink + ?Sized>(&mut self, now: Duration, sink: &mut K) {
        let usable = self.nibbles.len() & !1;
        match decode_packet(&self.nibbles[..usable]) {
            Ok(packet) => {
                info!("Packet decoded from {} nibbles", usable);
                sink.emit(ReceiverEvent::Decoded(packet));
            }
            Err(err) => {
                warn!("Packet dropped: {}", err);
                sink.emit(ReceiverEvent::Failed(err));
            }
        }

        self.reset();
        self.cooldown_until = Some(now + COOLDOWN);
    }

    fn reset(&mut self) {
        self.state = ReceiverState::Idle;
        self.nibbles.clear();
        self.window.clear();
        self.silent_windows = 0;
        self.preamble_since = None;
        self.preamble_misses = 0;
        self.expected_nibbles = None;
        self.cooldown_until = None;
    }
}

/// Interpret an even-length nibble stream as header + payload.
///
/// No checksum exists on the wire: corrupted symbols come out as wrong bytes.
/// A payload shorter than declared is returned as-is.
fn decode_packet(nibbles: &[u8]) -> Result<Packet, DecodeError> {
    if nibbles.len() < HEADER_NIBBLES {
        return Err(DecodeError::Incomplete {
            nibbles: nibbles.len(),
        });
    }

    let bytes = nibbles_to_bytes(nibbles);
    let header = parse_header(&bytes).ok_or(DecodeError::BadHeader)?;

    let available = bytes.len() - HEADER_SIZE;
    let declared = header.payload_len as usize;
    if declared > available {
        warn!(
            "Short read: header declares {} bytes, only {} received",
            declared, available
        );
    }
    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + declared.min(available)];

    match header.packet_type {
        PacketType::Text => Ok(Packet::Text {
            text: String::from_utf8_lossy(payload).into_owned(),
        }),
        PacketType::Image => Ok(Packet::Image {
            width: header.width,
            height: header.height,
            data: payload.to_vec(),
        }),
        PacketType::Unknown(byte) => Err(DecodeError::UnknownType(byte)),
    }
}
