//! Port-level commands sent by IMEI-identified stations
//!
//! These payloads carry no wire header. The `header` field on each struct is
//! kept so responses can mirror what the dispatcher saw, but it never reaches
//! the wire.

use serde::{Deserialize, Serialize};

use super::Message;
use crate::command::Command;
use crate::error::{ProtoError, Result};
use crate::field::{FieldReader, FieldWriter};
use crate::frame::Header;

pub const IMEI_LEN: usize = 15;
pub const VERSION_LEN: usize = 16;
pub const CCID_LEN: usize = 20;
pub const ORDER_NUMBER_LEN: usize = 16;
pub const CARD_NUMBER_LEN: usize = 16;

/// Heartbeat period a station falls back to when asked for something absurd
pub const DEFAULT_HEARTBEAT_PERIOD: u8 = 30;
pub const MIN_HEARTBEAT_PERIOD: u8 = 10;
pub const MAX_HEARTBEAT_PERIOD: u8 = 250;

/// Station login, the first frame on a station connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLogin {
    #[serde(default)]
    pub header: Header,
    pub imei: String,
    pub device_port_count: u8,
    pub hardware_version: String,
    pub software_version: String,
    pub ccid: String,
    pub signal_value: u8,
    pub login_reason: u8,
}

impl Message for DeviceLogin {
    const COMMAND: Command = Command::DeviceLogin;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            imei: r.ascii(IMEI_LEN)?,
            device_port_count: r.u8()?,
            hardware_version: r.ascii(VERSION_LEN)?,
            software_version: r.ascii(VERSION_LEN)?,
            ccid: r.ascii(CCID_LEN)?,
            signal_value: r.u8()?,
            login_reason: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.ascii(&self.imei, IMEI_LEN)?
            .u8(self.device_port_count)
            .ascii(&self.hardware_version, VERSION_LEN)?
            .ascii(&self.software_version, VERSION_LEN)?
            .ascii(&self.ccid, CCID_LEN)?
            .u8(self.signal_value)
            .u8(self.login_reason);
        Ok(())
    }
}

/// Structured login reply. The proxy itself answers logins with
/// [`LOGIN_ACK`](crate::frame::LOGIN_ACK).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLoginResponse {
    #[serde(default)]
    pub header: Header,
    /// Epoch milliseconds
    pub time: i64,
    pub heartbeat_period: u8,
    pub result: u8,
}

impl DeviceLoginResponse {
    /// Period actually sent: out-of-range values become the default
    pub fn effective_heartbeat_period(&self) -> u8 {
        if (MIN_HEARTBEAT_PERIOD..=MAX_HEARTBEAT_PERIOD).contains(&self.heartbeat_period) {
            self.heartbeat_period
        } else {
            DEFAULT_HEARTBEAT_PERIOD
        }
    }
}

impl Message for DeviceLoginResponse {
    const COMMAND: Command = Command::DeviceLogin;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            time: r.time()?,
            heartbeat_period: r.u8()?,
            result: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.time(self.time)?
            .u8(self.effective_heartbeat_period())
            .u8(self.result);
        Ok(())
    }
}

/// Periodic station status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(default)]
    pub header: Header,
    pub signal_value: u8,
    pub temperature: u8,
    /// One status byte per port
    pub port_status: Vec<u8>,
}

impl Message for Heartbeat {
    const COMMAND: Command = Command::Heartbeat;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        let signal_value = r.u8()?;
        let temperature = r.u8()?;
        let total_port_count = r.u8()? as usize;
        let port_status = r.bytes(total_port_count)?.to_vec();
        Ok(Self {
            header,
            signal_value,
            temperature,
            port_status,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        let count = u8::try_from(self.port_status.len()).map_err(|_| {
            ProtoError::encoding(format!("{} ports do not fit one byte", self.port_status.len()))
        })?;
        w.u8(self.signal_value)
            .u8(self.temperature)
            .u8(count)
            .bytes(&self.port_status);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    #[serde(default)]
    pub header: Header,
}

impl Message for HeartbeatResponse {
    const COMMAND: Command = Command::Heartbeat;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        r.u8()?;
        Ok(Self { header })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.u8(0x00);
        Ok(())
    }
}

/// Station reports a session started on one of its ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStart {
    #[serde(default)]
    pub header: Header,
    pub port: u8,
    pub order_number: String,
    pub start_method: u8,
    pub card_number: String,
    pub charging_method: u8,
    pub charging_param: u32,
    pub available_amount: u32,
}

impl Message for RemoteStart {
    const COMMAND: Command = Command::RemoteStart;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            port: r.u8()?,
            order_number: r.bcd(ORDER_NUMBER_LEN)?,
            start_method: r.u8()?,
            card_number: r.ascii(CARD_NUMBER_LEN)?,
            charging_method: r.u8()?,
            charging_param: r.u32()?,
            available_amount: r.u32()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.u8(self.port)
            .bcd(&self.order_number, ORDER_NUMBER_LEN)?
            .u8(self.start_method)
            .ascii(&self.card_number, CARD_NUMBER_LEN)?
            .u8(self.charging_method)
            .u32(self.charging_param)
            .u32(self.available_amount);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStartResponse {
    #[serde(default)]
    pub header: Header,
    pub port: u8,
    pub order_number: String,
    pub start_method: u8,
    pub result: u8,
}

impl Message for RemoteStartResponse {
    const COMMAND: Command = Command::RemoteStart;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            port: r.u8()?,
            order_number: r.bcd(ORDER_NUMBER_LEN)?,
            start_method: r.u8()?,
            result: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.u8(self.port)
            .bcd(&self.order_number, ORDER_NUMBER_LEN)?
            .u8(self.start_method)
            .u8(self.result);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStop {
    #[serde(default)]
    pub header: Header,
    pub port: u8,
    pub order_number: String,
}

impl Message for RemoteStop {
    const COMMAND: Command = Command::RemoteStop;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            port: r.u8()?,
            order_number: r.bcd(ORDER_NUMBER_LEN)?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.u8(self.port).bcd(&self.order_number, ORDER_NUMBER_LEN)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStopResponse {
    #[serde(default)]
    pub header: Header,
    pub port: u8,
    pub order_number: String,
    pub result: u8,
}

impl Message for RemoteStopResponse {
    const COMMAND: Command = Command::RemoteStop;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            port: r.u8()?,
            order_number: r.bcd(ORDER_NUMBER_LEN)?,
            result: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.u8(self.port)
            .bcd(&self.order_number, ORDER_NUMBER_LEN)?
            .u8(self.result);
        Ok(())
    }
}

/// Final session accounting, with per-segment tariff detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitFinalStatus {
    #[serde(default)]
    pub header: Header,
    pub port: u8,
    pub order_number: String,
    pub charging_time: u32,
    pub electricity_usage: u32,
    pub usage_cost: u32,
    pub stop_reason: u8,
    pub stop_power: u16,
    pub segment_durations: Vec<u16>,
    pub segment_prices: Vec<u16>,
}

impl Message for SubmitFinalStatus {
    const COMMAND: Command = Command::SubmitFinalStatus;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        let port = r.u8()?;
        let order_number = r.bcd(ORDER_NUMBER_LEN)?;
        let charging_time = r.u32()?;
        let electricity_usage = r.u32()?;
        let usage_cost = r.u32()?;
        let stop_reason = r.u8()?;
        let stop_power = r.u16()?;

        let segment_count = r.u8()? as usize;
        if r.remaining() < segment_count * 4 {
            return Err(ProtoError::malformed(format!(
                "{} segments declared, room for {}",
                segment_count,
                r.remaining() / 4
            )));
        }

        let mut segment_durations = Vec::with_capacity(segment_count);
        let mut segment_prices = Vec::with_capacity(segment_count);
        for _ in 0..segment_count {
            segment_durations.push(r.u16()?);
            segment_prices.push(r.u16()?);
        }

        Ok(Self {
            header,
            port,
            order_number,
            charging_time,
            electricity_usage,
            usage_cost,
            stop_reason,
            stop_power,
            segment_durations,
            segment_prices,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        if self.segment_durations.len() != self.segment_prices.len() {
            return Err(ProtoError::encoding(format!(
                "{} segment durations but {} prices",
                self.segment_durations.len(),
                self.segment_prices.len()
            )));
        }
        let segments = self.segment_durations.len();
        let count = u8::try_from(segments).map_err(|_| {
            ProtoError::encoding(format!("{} segments do not fit one byte", segments))
        })?;

        w.u8(self.port)
            .bcd(&self.order_number, ORDER_NUMBER_LEN)?
            .u32(self.charging_time)
            .u32(self.electricity_usage)
            .u32(self.usage_cost)
            .u8(self.stop_reason)
            .u16(self.stop_power)
            .u8(count);
        for (duration, price) in self.segment_durations.iter().zip(&self.segment_prices) {
            w.u16(*duration).u16(*price);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitFinalStatusResponse {
    #[serde(default)]
    pub header: Header,
    pub result: u8,
}

impl Message for SubmitFinalStatusResponse {
    const COMMAND: Command = Command::SubmitFinalStatus;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            result: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.u8(self.result);
        Ok(())
    }
}

/// Live readings for one port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingPortData {
    #[serde(default)]
    pub header: Header,
    pub port: u8,
    pub status: u8,
    pub voltage: u16,
    pub current: u16,
    pub power: u32,
    pub energy: u32,
    pub charging_time: u32,
    pub temperature: u8,
}

impl Message for ChargingPortData {
    const COMMAND: Command = Command::ChargingPortData;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            port: r.u8()?,
            status: r.u8()?,
            voltage: r.u16()?,
            current: r.u16()?,
            power: r.u32()?,
            energy: r.u32()?,
            charging_time: r.u32()?,
            temperature: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.u8(self.port)
            .u8(self.status)
            .u16(self.voltage)
            .u16(self.current)
            .u32(self.power)
            .u32(self.energy)
            .u32(self.charging_time)
            .u8(self.temperature);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_frame, RawFrame};
    use crate::messages::decode_message;
    use crate::messages::test_util::roundtrip;

    const ORDER: &str = "20240615143000000000000000000001";

    fn login() -> DeviceLogin {
        DeviceLogin {
            header: Header::default(),
            imei: "860123456789012".into(),
            device_port_count: 10,
            hardware_version: "HW-2.1".into(),
            software_version: "SW-3.4.5".into(),
            ccid: "89860412345678901234".into(),
            signal_value: 28,
            login_reason: 0,
        }
    }

    #[test]
    fn test_device_login_roundtrip() {
        let bytes = roundtrip(login());
        // no wire header: imei starts right after the command byte
        assert_eq!(&bytes[5..20], b"860123456789012");
        assert_eq!(bytes.len(), 2 + 3 + 70 + 2);
    }

    #[test]
    fn test_device_login_corrupted_checksum_rejected() {
        let mut bytes = login().encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let raw = RawFrame::parse(&bytes).unwrap();
        assert!(matches!(
            decode_message::<DeviceLogin>(&raw),
            Err(ProtoError::ChecksumMismatch { command: 0x81, .. })
        ));
    }

    #[test]
    fn test_login_response_clamps_heartbeat_period() {
        let msg = DeviceLoginResponse {
            header: Header::default(),
            time: 1_718_461_800_000,
            heartbeat_period: 60,
            result: 0,
        };
        roundtrip(msg.clone());

        let odd = DeviceLoginResponse {
            heartbeat_period: 5,
            ..msg
        };
        let raw = RawFrame::parse(&odd.encode().unwrap()).unwrap();
        let decoded: DeviceLoginResponse = decode_message(&raw).unwrap();
        assert_eq!(decoded.heartbeat_period, DEFAULT_HEARTBEAT_PERIOD);
    }

    #[test]
    fn test_heartbeat_response_golden_frame() {
        let bytes = HeartbeatResponse::default().encode().unwrap();
        assert_eq!(bytes, vec![0x5A, 0xA5, 0x04, 0x00, 0x82, 0x00, 0x86]);
    }

    #[test]
    fn test_heartbeat_ports() {
        let bytes = roundtrip(Heartbeat {
            header: Header::default(),
            signal_value: 25,
            temperature: 40,
            port_status: vec![0, 1, 0, 2],
        });
        // one-byte summation checksum
        assert_eq!(bytes.len(), 2 + 3 + 7 + 1);

        // port count larger than what follows
        let frame = encode_frame(Command::Heartbeat, &[25, 40, 9, 0]).unwrap();
        let raw = RawFrame::parse(&frame).unwrap();
        assert!(matches!(
            decode_message::<Heartbeat>(&raw),
            Err(ProtoError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_remote_start_stop_roundtrips() {
        let header = Header::default();
        roundtrip(RemoteStart {
            header,
            port: 3,
            order_number: ORDER.into(),
            start_method: 1,
            card_number: "CARD0001".into(),
            charging_method: 0,
            charging_param: 3600,
            available_amount: 5000,
        });
        roundtrip(RemoteStartResponse {
            header,
            port: 3,
            order_number: ORDER.into(),
            start_method: 1,
            result: 0,
        });
        roundtrip(RemoteStop {
            header,
            port: 3,
            order_number: ORDER.into(),
        });
        roundtrip(RemoteStopResponse {
            header,
            port: 3,
            order_number: ORDER.into(),
            result: 0,
        });
        roundtrip(SubmitFinalStatusResponse { header, result: 0 });
        roundtrip(ChargingPortData {
            header,
            port: 1,
            status: 2,
            voltage: 2200,
            current: 160,
            power: 3520,
            energy: 1200,
            charging_time: 900,
            temperature: 35,
        });
    }

    fn final_status() -> SubmitFinalStatus {
        SubmitFinalStatus {
            header: Header::default(),
            port: 2,
            order_number: ORDER.into(),
            charging_time: 3600,
            electricity_usage: 7000,
            usage_cost: 1050,
            stop_reason: 1,
            stop_power: 3500,
            segment_durations: vec![1800, 1800],
            segment_prices: vec![150, 120],
        }
    }

    #[test]
    fn test_submit_final_status_segments() {
        let decoded = {
            let bytes = roundtrip(final_status());
            let raw = RawFrame::parse(&bytes).unwrap();
            decode_message::<SubmitFinalStatus>(&raw).unwrap()
        };
        assert_eq!(decoded.segment_durations, vec![1800, 1800]);
        assert_eq!(decoded.segment_prices, vec![150, 120]);
    }

    #[test]
    fn test_submit_final_status_count_exceeds_records() {
        let raw = RawFrame::parse(&final_status().encode().unwrap()).unwrap();

        // bump segment_count from 2 to 3 without adding a record
        let mut payload = raw.payload.clone();
        let count_at = 1 + ORDER_NUMBER_LEN + 4 + 4 + 4 + 1 + 2;
        assert_eq!(payload[count_at], 2);
        payload[count_at] = 3;

        let frame = encode_frame(Command::SubmitFinalStatus, &payload).unwrap();
        let raw = RawFrame::parse(&frame).unwrap();
        assert!(matches!(
            decode_message::<SubmitFinalStatus>(&raw),
            Err(ProtoError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_submit_final_status_mismatched_segments() {
        let mut msg = final_status();
        msg.segment_prices.pop();
        assert!(matches!(msg.encode(), Err(ProtoError::Encoding(_))));
    }
}
