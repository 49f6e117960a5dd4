use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio device permission denied")]
    PermissionDenied,

    #[error("A session is already active on this device")]
    SessionActive,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(u8),
}

impl ModemError {
    /// Short machine-readable code for status reporting
    pub fn code(&self) -> &'static str {
        match self {
            ModemError::DeviceUnavailable(_) | ModemError::PermissionDenied => "DEVICE_ERROR",
            ModemError::SessionActive => "SESSION_ACTIVE",
            ModemError::InvalidConfig(_) => "INVALID_CONFIG",
            ModemError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ModemError::InvalidSymbol(_) => "INVALID_SYMBOL",
        }
    }
}

pub type Result<T> = std::result::Result<T, ModemError>;

/// Packet-level failures seen by the receiver.
///
/// These never abort listening: the session reports them as events and
/// returns to IDLE.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Incomplete packet: {nibbles} nibbles received, header needs 32")]
    Incomplete { nibbles: usize },

    #[error("Bad packet header (magic mismatch)")]
    BadHeader,

    #[error("Unknown packet type 0x{0:02X}")]
    UnknownType(u8),

    #[error("Timed out waiting for packet data")]
    Timeout,
}

impl DecodeError {
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::Incomplete { .. } => "INCOMPLETE",
            DecodeError::BadHeader => "BAD_HEADER",
            DecodeError::UnknownType(_) => "UNKNOWN_TYPE",
            DecodeError::Timeout => "TIMEOUT",
        }
    }
}
