//! Frame envelope
//!
//! ```text
//! +-------+-------+-----+---------+----------+
//! | 5A A5 | LEN   | CMD | PAYLOAD | CHECKSUM |
//! +-------+-------+-----+---------+----------+
//!   2       2 LE    1     n         1 or 2
//! ```
//!
//! `LEN` counts the bytes between the start marker and the checksum: the
//! length field itself, the command byte and the payload. The checksum covers
//! the same span.

use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumKind;
use crate::command::{Command, Family};
use crate::error::{ProtoError, Result};
use crate::primitives::generate_sequence;

/// Frame start marker
pub const START_MARKER: [u8; 2] = [0x5A, 0xA5];

/// Length field plus command byte
pub const LEN_OVERHEAD: usize = 3;

/// Bytes of wire header carried by platform-family payloads
pub const WIRE_HEADER_LEN: usize = 3;

/// Smallest possible frame: marker, length, command, one checksum byte
pub const MIN_FRAME_LEN: usize = START_MARKER.len() + LEN_OVERHEAD + 1;

/// Fixed acknowledgment written back for every valid device login.
///
/// Always this literal, whatever the login carried.
pub const LOGIN_ACK: [u8; 16] = [
    0x5A, 0xA5, // start marker
    0x0C, 0x00, // length
    0x81, // command
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // reserved
    0xF0, 0x7D, // footer
];

/// Logical message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    /// Device correlation id, not a transport counter
    pub sequence: u16,
    pub encrypted: bool,
}

impl Header {
    pub fn new(sequence: u16, encrypted: bool) -> Self {
        Self {
            sequence,
            encrypted,
        }
    }

    /// Header used for responses the proxy synthesizes on its own
    pub fn auto_response() -> Self {
        Self::default()
    }

    /// Header for administrator-initiated commands
    pub fn generated() -> Self {
        Self::new(generate_sequence(), false)
    }
}

/// Checksum kind for a raw code, CRC for anything unknown so that framing can
/// still skip over it.
pub fn checksum_kind_for(code: u8) -> ChecksumKind {
    Command::from_u8(code)
        .map(Command::checksum_kind)
        .unwrap_or(ChecksumKind::Crc16)
}

/// One frame split into its parts, checksum not yet verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub code: u8,
    pub payload: Vec<u8>,
    pub checksum: Vec<u8>,
}

impl RawFrame {
    /// Split a complete frame. `data` must hold exactly one frame.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_FRAME_LEN {
            return Err(ProtoError::malformed(format!("frame too short: {} bytes", data.len())));
        }
        if data[..2] != START_MARKER {
            return Err(ProtoError::malformed(format!(
                "bad start marker {:02x}{:02x}",
                data[0], data[1]
            )));
        }

        let len = u16::from_le_bytes([data[2], data[3]]) as usize;
        if len < LEN_OVERHEAD {
            return Err(ProtoError::malformed(format!("length field {} too small", len)));
        }

        let code = data[4];
        let expected = START_MARKER.len() + len + checksum_kind_for(code).len();
        if data.len() != expected {
            return Err(ProtoError::malformed(format!(
                "length field says {} bytes, frame has {}",
                expected,
                data.len()
            )));
        }

        let body_end = START_MARKER.len() + len;
        Ok(Self {
            code,
            payload: data[5..body_end].to_vec(),
            checksum: data[body_end..].to_vec(),
        })
    }

    /// Resolve the command code
    pub fn command(&self) -> Result<Command> {
        Command::from_u8(self.code)
    }

    /// Length field value
    pub fn length(&self) -> usize {
        LEN_OVERHEAD + self.payload.len()
    }

    /// The span covered by the checksum: length field, command, payload
    pub fn covered(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.extend_from_slice(&(self.length() as u16).to_le_bytes());
        out.push(self.code);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn verify_checksum(&self) -> Result<()> {
        let expected = checksum_kind_for(self.code).compute(&self.covered());
        if expected != self.checksum {
            return Err(ProtoError::ChecksumMismatch {
                command: self.code,
                expected,
                actual: self.checksum.clone(),
            });
        }
        Ok(())
    }

    /// Reassemble the wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = START_MARKER.to_vec();
        out.extend_from_slice(&self.covered());
        out.extend_from_slice(&self.checksum);
        out
    }

    /// Split off the header. Platform payloads carry it on the wire, station
    /// payloads get the default.
    pub fn split_header(&self) -> Result<(Header, &[u8])> {
        match self.command()?.family() {
            Family::Platform => {
                if self.payload.len() < WIRE_HEADER_LEN {
                    return Err(ProtoError::malformed("payload shorter than wire header"));
                }
                let sequence = u16::from_le_bytes([self.payload[0], self.payload[1]]);
                let encrypted = self.payload[2] != 0;
                Ok((Header::new(sequence, encrypted), &self.payload[WIRE_HEADER_LEN..]))
            }
            Family::Station => Ok((Header::default(), &self.payload[..])),
        }
    }
}

/// Wrap a payload in marker, length and checksum
pub fn encode_frame(command: Command, payload: &[u8]) -> Result<Vec<u8>> {
    let len = LEN_OVERHEAD + payload.len();
    let len = u16::try_from(len).map_err(|_| {
        ProtoError::encoding(format!("payload of {} bytes too large", payload.len()))
    })?;

    let mut out = Vec::with_capacity(START_MARKER.len() + len as usize + 2);
    out.extend_from_slice(&START_MARKER);
    out.extend_from_slice(&len.to_le_bytes());
    out.push(command.code());
    out.extend_from_slice(payload);

    let checksum = command.checksum_kind().compute(&out[START_MARKER.len()..]);
    out.extend_from_slice(&checksum);
    Ok(out)
}

/// Prefix a body with the wire header when the command's family carries one
pub fn with_header(command: Command, header: Header, body: Vec<u8>) -> Vec<u8> {
    match command.family() {
        Family::Platform => {
            let mut out = Vec::with_capacity(WIRE_HEADER_LEN + body.len());
            out.extend_from_slice(&header.sequence.to_le_bytes());
            out.push(u8::from(header.encrypted));
            out.extend(body);
            out
        }
        Family::Station => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_response_envelope() {
        let frame = encode_frame(Command::Heartbeat, &[0x00]).unwrap();
        assert_eq!(frame, vec![0x5A, 0xA5, 0x04, 0x00, 0x82, 0x00, 0x86]);

        let raw = RawFrame::parse(&frame).unwrap();
        assert_eq!(raw.command().unwrap(), Command::Heartbeat);
        raw.verify_checksum().unwrap();
        assert_eq!(raw.to_bytes(), frame);
    }

    #[test]
    fn test_login_ack_length_matches_literal() {
        let raw = RawFrame::parse(&LOGIN_ACK).unwrap();
        assert_eq!(raw.length(), 0x0C);
        assert_eq!(raw.payload, vec![0u8; 9]);
        assert_eq!(raw.checksum, vec![0xF0, 0x7D]);
    }

    #[test]
    fn test_platform_header_split() {
        let header = Header::new(0x0102, true);
        let payload = with_header(Command::RemoteRebootRequest, header, vec![0xAA]);
        assert_eq!(payload, vec![0x02, 0x01, 0x01, 0xAA]);

        let frame = encode_frame(Command::RemoteRebootRequest, &payload).unwrap();
        let raw = RawFrame::parse(&frame).unwrap();
        let (header, body) = raw.split_header().unwrap();
        assert_eq!(header, Header::new(0x0102, true));
        assert_eq!(body, &[0xAA]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RawFrame::parse(&[]).is_err());
        assert!(RawFrame::parse(&[0x00; 8]).is_err());
        // length says 5 but only 4 bytes follow the marker
        assert!(RawFrame::parse(&[0x5A, 0xA5, 0x05, 0x00, 0x01, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_corrupted_checksum_detected() {
        let mut frame = encode_frame(Command::RemoteShutdownRequest, &[0, 0, 0, 1]).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let raw = RawFrame::parse(&frame).unwrap();
        assert!(matches!(
            raw.verify_checksum(),
            Err(ProtoError::ChecksumMismatch { command: 0x36, .. })
        ));
    }
}
