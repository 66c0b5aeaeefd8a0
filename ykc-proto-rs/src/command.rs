//! Command codes
//!
//! | Inbound (pile → proxy)           | Outbound (proxy → pile)               |
//! |----------------------------------|---------------------------------------|
//! | `01` Verification                | `02` VerificationResponse             |
//! | `05` BillingModelVerification    | `06` BillingModelVerificationResponse |
//! | `09` BillingModelRequest         | `0a` BillingModelResponse             |
//! | `13` OfflineDataReport           | -                                     |
//! | `19` ChargingFinished            | -                                     |
//! | `33` RemoteBootstrapResponse     | `34` RemoteBootstrapRequest           |
//! | `35` RemoteShutdownResponse      | `36` RemoteShutdownRequest            |
//! | `3b` TransactionRecord           | `40` TransactionRecordConfirmed       |
//! | `57` SetBillingModelResponse     | `58` SetBillingModelRequest           |
//! | `81` DeviceLogin                 | `81` login acknowledgment             |
//! | `82` Heartbeat                   | `82` HeartbeatResponse                |
//! | `83` RemoteStart                 | `83` RemoteStartResponse              |
//! | `84` RemoteStop                  | `84` RemoteStopResponse               |
//! | `85` SubmitFinalStatus           | `85` SubmitFinalStatusResponse        |
//! | `88` ChargingPortData            | -                                     |
//! | `91` RemoteRebootResponse        | `92` RemoteRebootRequest              |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumKind;
use crate::error::ProtoError;

/// Frame layout family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Payload starts with the 3-byte wire header (sequence, encryption flag)
    Platform,
    /// Payload carries fields only; the header is implicit
    Station,
}

/// One-byte command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    Verification = 0x01,
    VerificationResponse = 0x02,
    BillingModelVerification = 0x05,
    BillingModelVerificationResponse = 0x06,
    BillingModelRequest = 0x09,
    BillingModelResponse = 0x0A,
    OfflineDataReport = 0x13,
    ChargingFinished = 0x19,
    RemoteBootstrapResponse = 0x33,
    RemoteBootstrapRequest = 0x34,
    RemoteShutdownResponse = 0x35,
    RemoteShutdownRequest = 0x36,
    TransactionRecord = 0x3B,
    TransactionRecordConfirmed = 0x40,
    SetBillingModelResponse = 0x57,
    SetBillingModelRequest = 0x58,
    DeviceLogin = 0x81,
    Heartbeat = 0x82,
    RemoteStart = 0x83,
    RemoteStop = 0x84,
    SubmitFinalStatus = 0x85,
    ChargingPortData = 0x88,
    RemoteRebootResponse = 0x91,
    RemoteRebootRequest = 0x92,
}

impl Command {
    /// Look up a code read off the wire
    pub fn from_u8(code: u8) -> Result<Self, ProtoError> {
        let command = match code {
            0x01 => Command::Verification,
            0x02 => Command::VerificationResponse,
            0x05 => Command::BillingModelVerification,
            0x06 => Command::BillingModelVerificationResponse,
            0x09 => Command::BillingModelRequest,
            0x0A => Command::BillingModelResponse,
            0x13 => Command::OfflineDataReport,
            0x19 => Command::ChargingFinished,
            0x33 => Command::RemoteBootstrapResponse,
            0x34 => Command::RemoteBootstrapRequest,
            0x35 => Command::RemoteShutdownResponse,
            0x36 => Command::RemoteShutdownRequest,
            0x3B => Command::TransactionRecord,
            0x40 => Command::TransactionRecordConfirmed,
            0x57 => Command::SetBillingModelResponse,
            0x58 => Command::SetBillingModelRequest,
            0x81 => Command::DeviceLogin,
            0x82 => Command::Heartbeat,
            0x83 => Command::RemoteStart,
            0x84 => Command::RemoteStop,
            0x85 => Command::SubmitFinalStatus,
            0x88 => Command::ChargingPortData,
            0x91 => Command::RemoteRebootResponse,
            0x92 => Command::RemoteRebootRequest,
            other => return Err(ProtoError::UnknownCommand(other)),
        };
        Ok(command)
    }

    /// Raw code byte
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Forwarder topic: the code as two lowercase hex digits
    pub fn topic(self) -> String {
        format!("{:02x}", self.code())
    }

    /// Layout family of this command
    pub fn family(self) -> Family {
        match self {
            Command::DeviceLogin
            | Command::Heartbeat
            | Command::RemoteStart
            | Command::RemoteStop
            | Command::SubmitFinalStatus
            | Command::ChargingPortData => Family::Station,
            _ => Family::Platform,
        }
    }

    /// Checksum closing frames of this command
    pub fn checksum_kind(self) -> ChecksumKind {
        match self {
            Command::Heartbeat => ChecksumKind::Sum8,
            _ => ChecksumKind::Crc16,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:02x}] {:?}", self.code(), self)
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtoError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Command::from_u8(code)
    }
}
