use crate::error::DecodeError;
use log::{info, warn};
use std::fmt;

/// A successfully decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Text { text: String },
    /// Raw image bytes for the external decoder, with the declared size
    Image { width: u16, height: u16, data: Vec<u8> },
}

/// Progress and outcome notifications from a receive session.
///
/// Purely informational: nothing a sink does can influence the protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    Listening,
    PreambleDetected,
    ReceivingData,
    Progress {
        received_bytes: usize,
        expected_bytes: usize,
        percent: f32,
    },
    Decoded(Packet),
    Failed(DecodeError),
    WaitingForPreamble,
}

impl fmt::Display for ReceiverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverEvent::Listening => write!(f, "Listening"),
            ReceiverEvent::PreambleDetected => write!(f, "Preamble detected"),
            ReceiverEvent::ReceivingData => write!(f, "Receiving data"),
            ReceiverEvent::Progress {
                received_bytes,
                expected_bytes,
                percent,
            } => write!(
                f,
                "Received {}/{} bytes ({:.0}%)",
                received_bytes, expected_bytes, percent
            ),
            ReceiverEvent::Decoded(Packet::Text { text }) => {
                write!(f, "Received text ({} bytes): {}", text.len(), text)
            }
            ReceiverEvent::Decoded(Packet::Image {
                width,
                height,
                data,
            }) => write!(f, "Received image {}x{} ({} bytes)", width, height, data.len()),
            ReceiverEvent::Failed(err) => write!(f, "{}: {}", err.code(), err),
            ReceiverEvent::WaitingForPreamble => write!(f, "Waiting for preamble"),
        }
    }
}

pub trait StatusSink {
    fn emit(&mut self, event: ReceiverEvent);
}

impl StatusSink for Vec<ReceiverEvent> {
    fn emit(&mut self, event: ReceiverEvent) {
        self.push(event);
    }
}

/// Forwards events to the `log` facade
#[derive(Debug, Default)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn emit(&mut self, event: ReceiverEvent) {
        match event {
            ReceiverEvent::Failed(_) => warn!("{}", event),
            _ => info!("{}", event),
        }
    }
}
