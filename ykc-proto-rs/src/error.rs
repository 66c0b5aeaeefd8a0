//! Errors raised while framing, decoding or encoding pile messages

use thiserror::Error;

/// Errors in wire-level protocol handling
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("checksum mismatch on command {command:#04x}: expected {expected:02x?}, got {actual:02x?}")]
    ChecksumMismatch {
        command: u8,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown command code {0:#04x}")]
    UnknownCommand(u8),

    #[error("expected command {expected:#04x}, got {actual:#04x}")]
    UnexpectedCommand { expected: u8, actual: u8 },

    #[error("command {0:#04x} is never sent by a pile")]
    NotInbound(u8),

    #[error("cannot encode field: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtoError {
    /// Shorthand for a truncated or otherwise unreadable frame
    pub fn malformed(reason: impl Into<String>) -> Self {
        ProtoError::MalformedFrame(reason.into())
    }

    /// Shorthand for a structured value that cannot be put on the wire
    pub fn encoding(reason: impl Into<String>) -> Self {
        ProtoError::Encoding(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, ProtoError>;
