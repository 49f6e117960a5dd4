use crate::{HEADER_SIZE, MAGIC};

/// Payload kind carried in header byte 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Text,
    Image,
    Unknown(u8),
}

impl PacketType {
    pub const TEXT_BYTE: u8 = 0x54;
    pub const IMAGE_BYTE: u8 = 0x49;

    pub fn to_u8(self) -> u8 {
        match self {
            PacketType::Text => Self::TEXT_BYTE,
            PacketType::Image => Self::IMAGE_BYTE,
            PacketType::Unknown(byte) => byte,
        }
    }
}

impl From<u8> for PacketType {
    fn from(byte: u8) -> Self {
        match byte {
            Self::TEXT_BYTE => PacketType::Text,
            Self::IMAGE_BYTE => PacketType::Image,
            other => PacketType::Unknown(other),
        }
    }
}

/// Fixed 16-byte packet header
///
/// Layout (big-endian):
/// - [0..4]   magic "ACST"
/// - [4]      packet type
/// - [5..9]   payload length
/// - [9..11]  image width (0 for text)
/// - [11..13] image height (0 for text)
/// - [13..16] reserved, zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub packet_type: PacketType,
    pub payload_len: u32,
    pub width: u16,
    pub height: u16,
}

impl Header {
    /// Total nibbles of a packet (header + payload) announced by this header
    pub fn packet_nibbles(&self) -> usize {
        (self.payload_len as usize)
            .saturating_add(HEADER_SIZE)
            .saturating_mul(2)
    }
}

pub fn build_header(packet_type: PacketType, payload_len: u32, width: u16, height: u16) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&MAGIC);
    header[4] = packet_type.to_u8();
    header[5..9].copy_from_slice(&payload_len.to_be_bytes());
    header[9..11].copy_from_slice(&width.to_be_bytes());
    header[11..13].copy_from_slice(&height.to_be_bytes());
    // [13..16] stay zero
    header
}

/// Parse a header from the front of `data`.
///
/// Returns `None` if fewer than 16 bytes are available or the magic differs.
/// Reserved bytes are not checked and the type byte is not validated here.
pub fn parse_header(data: &[u8]) -> Option<Header> {
    if data.len() < HEADER_SIZE || data[0..4] != MAGIC {
        return None;
    }

    let payload_len = u32::from_be_bytes([data[5], data[6], data[7], data[8]]);
    let width = u16::from_be_bytes([data[9], data[10]]);
    let height = u16::from_be_bytes([data[11], data[12]]);

    Some(Header {
        packet_type: PacketType::from(data[4]),
        payload_len,
        width,
        height,
    })
}

/// Split bytes into nibbles, high nibble first
pub fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Pair nibbles back into bytes; a trailing unpaired nibble is dropped
pub fn nibbles_to_bytes(nibbles: &[u8]) -> Vec<u8> {
    nibbles
        .chunks_exact(2)
        .map(|pair| ((pair[0] & 0x0F) << 4) | (pair[1] & 0x0F))
        .collect()
}

/// Header followed by payload
pub fn build_packet(header: &[u8; HEADER_SIZE], payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER_SIZE + payload.len());
    packet.extend_from_slice(header);
    packet.extend_from_slice(payload);
    packet
}
