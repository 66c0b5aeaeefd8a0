//! Typed messages, one struct per command code
//!
//! - `platform`: commands keyed by the 7-byte pile id (wire header, CRC)
//! - `station`: port-level commands keyed by the login IMEI (no wire header)
//!
//! Encoding is the sole authority for byte layout; decoding checks the command
//! code, the checksum and every field width before returning a value.

pub mod platform;
pub mod station;

pub use platform::*;
pub use station::*;

use crate::command::Command;
use crate::error::{ProtoError, Result};
use crate::field::{FieldReader, FieldWriter};
use crate::frame::{encode_frame, with_header, Header, RawFrame};

/// A message with a fixed command code and payload layout
pub trait Message: Sized {
    const COMMAND: Command;

    fn header(&self) -> Header;

    /// Read the payload fields that follow the wire header
    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self>;

    /// Write the payload fields that follow the wire header
    fn encode_body(&self, w: &mut FieldWriter) -> Result<()>;

    /// Full wire frame including checksum
    fn encode(&self) -> Result<Vec<u8>> {
        encode_message(self)
    }

    fn decode(raw: &RawFrame) -> Result<Self> {
        decode_message(raw)
    }
}

pub fn encode_message<M: Message>(msg: &M) -> Result<Vec<u8>> {
    let mut w = FieldWriter::new();
    msg.encode_body(&mut w)?;
    let payload = with_header(M::COMMAND, msg.header(), w.into_inner());
    encode_frame(M::COMMAND, &payload)
}

pub fn decode_message<M: Message>(raw: &RawFrame) -> Result<M> {
    if raw.code != M::COMMAND.code() {
        return Err(ProtoError::UnexpectedCommand {
            expected: M::COMMAND.code(),
            actual: raw.code,
        });
    }
    raw.verify_checksum()?;

    let (header, body) = raw.split_header()?;
    let mut r = FieldReader::new(body);
    M::decode_body(header, &mut r)
}

/// Anything a pile may send
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Verification(Verification),
    BillingModelVerification(BillingModelVerification),
    BillingModelRequest(BillingModelRequest),
    OfflineDataReport(OfflineDataReport),
    ChargingFinished(ChargingFinished),
    RemoteBootstrapResponse(RemoteBootstrapResponse),
    RemoteShutdownResponse(RemoteShutdownResponse),
    TransactionRecord(TransactionRecord),
    SetBillingModelResponse(SetBillingModelResponse),
    RemoteRebootResponse(RemoteRebootResponse),
    DeviceLogin(DeviceLogin),
    Heartbeat(Heartbeat),
    RemoteStart(RemoteStart),
    RemoteStop(RemoteStop),
    SubmitFinalStatus(SubmitFinalStatus),
    ChargingPortData(ChargingPortData),
}

impl Inbound {
    pub fn command(&self) -> Command {
        match self {
            Inbound::Verification(_) => Command::Verification,
            Inbound::BillingModelVerification(_) => Command::BillingModelVerification,
            Inbound::BillingModelRequest(_) => Command::BillingModelRequest,
            Inbound::OfflineDataReport(_) => Command::OfflineDataReport,
            Inbound::ChargingFinished(_) => Command::ChargingFinished,
            Inbound::RemoteBootstrapResponse(_) => Command::RemoteBootstrapResponse,
            Inbound::RemoteShutdownResponse(_) => Command::RemoteShutdownResponse,
            Inbound::TransactionRecord(_) => Command::TransactionRecord,
            Inbound::SetBillingModelResponse(_) => Command::SetBillingModelResponse,
            Inbound::RemoteRebootResponse(_) => Command::RemoteRebootResponse,
            Inbound::DeviceLogin(_) => Command::DeviceLogin,
            Inbound::Heartbeat(_) => Command::Heartbeat,
            Inbound::RemoteStart(_) => Command::RemoteStart,
            Inbound::RemoteStop(_) => Command::RemoteStop,
            Inbound::SubmitFinalStatus(_) => Command::SubmitFinalStatus,
            Inbound::ChargingPortData(_) => Command::ChargingPortData,
        }
    }

    /// Identity the message was sent under, if it names one
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Inbound::Verification(m) => Some(&m.id),
            Inbound::BillingModelVerification(m) => Some(&m.id),
            Inbound::BillingModelRequest(m) => Some(&m.id),
            Inbound::OfflineDataReport(m) => Some(&m.id),
            Inbound::ChargingFinished(m) => Some(&m.id),
            Inbound::RemoteBootstrapResponse(m) => Some(&m.id),
            Inbound::RemoteShutdownResponse(m) => Some(&m.id),
            Inbound::TransactionRecord(m) => Some(&m.id),
            Inbound::SetBillingModelResponse(m) => Some(&m.id),
            Inbound::RemoteRebootResponse(m) => Some(&m.id),
            Inbound::DeviceLogin(m) => Some(&m.imei),
            Inbound::Heartbeat(_)
            | Inbound::RemoteStart(_)
            | Inbound::RemoteStop(_)
            | Inbound::SubmitFinalStatus(_)
            | Inbound::ChargingPortData(_) => None,
        }
    }
}

/// Decode whatever a pile sent into its typed form
pub fn decode_inbound(raw: &RawFrame) -> Result<Inbound> {
    let msg = match raw.command()? {
        Command::Verification => Inbound::Verification(decode_message(raw)?),
        Command::BillingModelVerification => {
            Inbound::BillingModelVerification(decode_message(raw)?)
        }
        Command::BillingModelRequest => Inbound::BillingModelRequest(decode_message(raw)?),
        Command::OfflineDataReport => Inbound::OfflineDataReport(decode_message(raw)?),
        Command::ChargingFinished => Inbound::ChargingFinished(decode_message(raw)?),
        Command::RemoteBootstrapResponse => Inbound::RemoteBootstrapResponse(decode_message(raw)?),
        Command::RemoteShutdownResponse => Inbound::RemoteShutdownResponse(decode_message(raw)?),
        Command::TransactionRecord => Inbound::TransactionRecord(decode_message(raw)?),
        Command::SetBillingModelResponse => Inbound::SetBillingModelResponse(decode_message(raw)?),
        Command::RemoteRebootResponse => Inbound::RemoteRebootResponse(decode_message(raw)?),
        Command::DeviceLogin => Inbound::DeviceLogin(decode_message(raw)?),
        Command::Heartbeat => Inbound::Heartbeat(decode_message(raw)?),
        Command::RemoteStart => Inbound::RemoteStart(decode_message(raw)?),
        Command::RemoteStop => Inbound::RemoteStop(decode_message(raw)?),
        Command::SubmitFinalStatus => Inbound::SubmitFinalStatus(decode_message(raw)?),
        Command::ChargingPortData => Inbound::ChargingPortData(decode_message(raw)?),
        other => return Err(ProtoError::NotInbound(other.code())),
    };
    Ok(msg)
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::fmt::Debug;

    use super::*;

    /// Encode, reparse, decode, and compare
    pub fn roundtrip<M: Message + PartialEq + Debug>(msg: M) -> Vec<u8> {
        let bytes = msg.encode().expect("encode");
        let raw = RawFrame::parse(&bytes).expect("parse");
        let decoded: M = decode_message(&raw).expect("decode");
        assert_eq!(decoded, msg);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inbound_routes_by_code() {
        let msg = RemoteRebootResponse {
            header: Header::new(7, false),
            id: "32010200000001".into(),
            result: 1,
        };
        let raw = RawFrame::parse(&msg.encode().unwrap()).unwrap();

        let inbound = decode_inbound(&raw).unwrap();
        assert_eq!(inbound.command(), Command::RemoteRebootResponse);
        assert_eq!(inbound.device_id(), Some("32010200000001"));
        assert_eq!(inbound, Inbound::RemoteRebootResponse(msg));
    }

    #[test]
    fn test_decode_inbound_rejects_outbound_codes() {
        let msg = RemoteRebootRequest {
            header: Header::default(),
            id: "32010200000001".into(),
            control: 1,
        };
        let raw = RawFrame::parse(&msg.encode().unwrap()).unwrap();
        assert!(matches!(decode_inbound(&raw), Err(ProtoError::NotInbound(0x92))));
    }

    #[test]
    fn test_decode_checks_command() {
        let msg = RemoteRebootResponse {
            header: Header::default(),
            id: "32010200000001".into(),
            result: 0,
        };
        let raw = RawFrame::parse(&msg.encode().unwrap()).unwrap();
        assert!(matches!(
            decode_message::<SetBillingModelResponse>(&raw),
            Err(ProtoError::UnexpectedCommand { expected: 0x57, actual: 0x91 })
        ));
    }
}
