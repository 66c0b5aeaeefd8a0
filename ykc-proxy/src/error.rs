//! Proxy error types

use thiserror::Error;
use ykc_proto::ProtoError;

/// Errors from publishing to the forwarder
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Forwarder queue full")]
    QueueFull,

    #[error("Forwarder closed")]
    Closed,

    #[error("Cannot serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors surfaced by the proxy core
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    #[error("Write to {device_id} failed: {source}")]
    Write {
        device_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtoError),

    #[error("Invalid command: {0}")]
    InvalidCommand(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// HTTP-style status an administrative layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::UnknownClient(_)
            | ProxyError::InvalidCommand(_)
            | ProxyError::Protocol(ProtoError::Encoding(_)) => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProxyError::UnknownClient("B".into()).status_code(), 400);
        assert_eq!(
            ProxyError::Protocol(ProtoError::encoding("id too long")).status_code(),
            400
        );

        let write = ProxyError::Write {
            device_id: "A".into(),
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        };
        assert_eq!(write.status_code(), 500);
        assert!(write.to_string().contains("A"));
    }
}
