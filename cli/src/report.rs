use log::warn;
use serde::Serialize;
use tonelink_core::{LogSink, Packet, ReceiverEvent, StatusSink};

/// JSON form of a receiver event, one object per line
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventRecord<'a> {
    Listening,
    PreambleDetected,
    ReceivingData,
    Progress {
        received_bytes: usize,
        expected_bytes: usize,
        percent: f32,
    },
    Text {
        text: &'a str,
    },
    Image {
        width: u16,
        height: u16,
        bytes: usize,
    },
    Failed {
        code: &'static str,
        message: String,
    },
    WaitingForPreamble,
}

impl<'a> From<&'a ReceiverEvent> for EventRecord<'a> {
    fn from(event: &'a ReceiverEvent) -> Self {
        match event {
            ReceiverEvent::Listening => EventRecord::Listening,
            ReceiverEvent::PreambleDetected => EventRecord::PreambleDetected,
            ReceiverEvent::ReceivingData => EventRecord::ReceivingData,
            ReceiverEvent::Progress {
                received_bytes,
                expected_bytes,
                percent,
            } => EventRecord::Progress {
                received_bytes: *received_bytes,
                expected_bytes: *expected_bytes,
                percent: *percent,
            },
            ReceiverEvent::Decoded(Packet::Text { text }) => EventRecord::Text { text },
            ReceiverEvent::Decoded(Packet::Image {
                width,
                height,
                data,
            }) => EventRecord::Image {
                width: *width,
                height: *height,
                bytes: data.len(),
            },
            ReceiverEvent::Failed(err) => EventRecord::Failed {
                code: err.code(),
                message: err.to_string(),
            },
            ReceiverEvent::WaitingForPreamble => EventRecord::WaitingForPreamble,
        }
    }
}

/// Reports events on the console and keeps every decoded packet
#[derive(Debug, Default)]
pub struct ConsoleSink {
    json: bool,
    pub packets: Vec<Packet>,
}

impl ConsoleSink {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            packets: Vec::new(),
        }
    }
}

impl StatusSink for ConsoleSink {
    fn emit(&mut self, event: ReceiverEvent) {
        if self.json {
            match serde_json::to_string(&EventRecord::from(&event)) {
                Ok(line) => println!("{}", line),
                Err(err) => warn!("Cannot serialize event: {}", err),
            }
        } else {
            LogSink.emit(event.clone());
        }

        if let ReceiverEvent::Decoded(packet) = event {
            self.packets.push(packet);
        }
    }
}
