//! Pile-id keyed commands
//!
//! Every payload here starts with the 3-byte wire header and closes with the
//! table CRC. Pile ids are 7 BCD bytes (14 digits), trade sequence numbers are
//! 16 BCD bytes (32 digits).

use serde::{Deserialize, Serialize};

use super::Message;
use crate::command::Command;
use crate::error::{ProtoError, Result};
use crate::field::{FieldReader, FieldWriter};
use crate::frame::Header;

pub const PILE_ID_LEN: usize = 7;
pub const TRADE_SEQ_LEN: usize = 16;
pub const CARD_LEN: usize = 8;
pub const SIM_LEN: usize = 10;
pub const SOFTWARE_VERSION_LEN: usize = 8;
pub const LINE_CODE_LEN: usize = 8;
pub const VIN_LEN: usize = 17;

/// Half-hour slots in a billing model
pub const RATE_PERIODS: usize = 48;

// ============================================================================
// Verification (01 / 02)
// ============================================================================

/// Pile announces itself after connecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub header: Header,
    pub id: String,
    /// 0 = DC, 1 = AC
    pub elc_type: u8,
    pub guns: u8,
    pub protocol_version: u8,
    pub software_version: String,
    pub network: u8,
    pub sim: String,
    pub operator: u8,
}

impl Message for Verification {
    const COMMAND: Command = Command::Verification;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            elc_type: r.u8()?,
            guns: r.u8()?,
            protocol_version: r.u8()?,
            software_version: r.ascii(SOFTWARE_VERSION_LEN)?,
            network: r.u8()?,
            sim: r.bcd(SIM_LEN)?,
            operator: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?
            .u8(self.elc_type)
            .u8(self.guns)
            .u8(self.protocol_version)
            .ascii(&self.software_version, SOFTWARE_VERSION_LEN)?
            .u8(self.network)
            .bcd(&self.sim, SIM_LEN)?
            .u8(self.operator);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub id: String,
    /// Accepted goes out as 0x00
    pub result: bool,
}

impl Message for VerificationResponse {
    const COMMAND: Command = Command::VerificationResponse;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            result: r.u8()? == 0x00,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?.u8(result_code(self.result));
        Ok(())
    }
}

fn result_code(ok: bool) -> u8 {
    if ok {
        0x00
    } else {
        0x01
    }
}

// ============================================================================
// Billing model (05 / 06 / 09 / 0a / 57 / 58)
// ============================================================================

/// Pile asks whether its billing model is current
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingModelVerification {
    #[serde(default)]
    pub header: Header,
    pub id: String,
    pub billing_model_code: u16,
}

impl Message for BillingModelVerification {
    const COMMAND: Command = Command::BillingModelVerification;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            billing_model_code: r.u16()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?.u16(self.billing_model_code);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingModelVerificationResponse {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub id: String,
    pub billing_model_code: u16,
    /// Consistent goes out as 0x00
    pub result: bool,
}

impl Message for BillingModelVerificationResponse {
    const COMMAND: Command = Command::BillingModelVerificationResponse;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            billing_model_code: r.u16()?,
            result: r.u8()? == 0x00,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?
            .u16(self.billing_model_code)
            .u8(result_code(self.result));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingModelRequest {
    #[serde(default)]
    pub header: Header,
    pub id: String,
}

impl Message for BillingModelRequest {
    const COMMAND: Command = Command::BillingModelRequest;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?;
        Ok(())
    }
}

/// Electricity and service fee for one tariff tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatePair {
    pub electricity: u32,
    pub service: u32,
}

/// Tariff table shared by the billing-model response and set request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingModel {
    pub code: u16,
    pub sharp: RatePair,
    pub peak: RatePair,
    pub flat: RatePair,
    pub valley: RatePair,
    pub loss_ratio: u8,
    /// Tier index (0 sharp .. 3 valley) for each half hour of the day
    pub periods: Vec<u8>,
}

impl BillingModel {
    fn read(r: &mut FieldReader<'_>) -> Result<Self> {
        let code = r.u16()?;
        let mut tiers = [RatePair::default(); 4];
        for tier in tiers.iter_mut() {
            tier.electricity = r.u32()?;
            tier.service = r.u32()?;
        }
        let loss_ratio = r.u8()?;
        let periods = r.bytes(RATE_PERIODS)?.to_vec();

        let [sharp, peak, flat, valley] = tiers;
        Ok(Self {
            code,
            sharp,
            peak,
            flat,
            valley,
            loss_ratio,
            periods,
        })
    }

    fn write(&self, w: &mut FieldWriter) -> Result<()> {
        if self.periods.len() != RATE_PERIODS {
            return Err(ProtoError::encoding(format!(
                "billing model needs {} periods, got {}",
                RATE_PERIODS,
                self.periods.len()
            )));
        }

        w.u16(self.code);
        for tier in [self.sharp, self.peak, self.flat, self.valley] {
            w.u32(tier.electricity).u32(tier.service);
        }
        w.u8(self.loss_ratio).bytes(&self.periods);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingModelResponse {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub id: String,
    pub billing_model: BillingModel,
}

impl Message for BillingModelResponse {
    const COMMAND: Command = Command::BillingModelResponse;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            billing_model: BillingModel::read(r)?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?;
        self.billing_model.write(w)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBillingModelRequest {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub id: String,
    pub billing_model: BillingModel,
}

impl Message for SetBillingModelRequest {
    const COMMAND: Command = Command::SetBillingModelRequest;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            billing_model: BillingModel::read(r)?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?;
        self.billing_model.write(w)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBillingModelResponse {
    #[serde(default)]
    pub header: Header,
    pub id: String,
    pub result: u8,
}

impl Message for SetBillingModelResponse {
    const COMMAND: Command = Command::SetBillingModelResponse;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            result: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?.u8(self.result);
        Ok(())
    }
}

// ============================================================================
// Telemetry (13 / 19)
// ============================================================================

/// Real-time gun data, also replayed after an offline period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineDataReport {
    #[serde(default)]
    pub header: Header,
    pub trade_seq: String,
    pub id: String,
    pub gun_id: u8,
    pub status: u8,
    pub reset: u8,
    pub plugged: u8,
    /// Output voltage, 0.1 V
    pub ov: u16,
    /// Output current, 0.1 A
    pub oc: u16,
    pub line_temp: u8,
    pub line_code: String,
    pub bp_top_temp: u8,
    /// Minutes
    pub accumulated_charging_time: u16,
    /// Minutes
    pub remaining_time: u16,
    /// 0.0001 kWh
    pub charging_degrees: u32,
    pub lossy_charging_degrees: u32,
    /// 0.0001 currency units
    pub charged_amount: u32,
    pub hardware_failure: u16,
}

impl Message for OfflineDataReport {
    const COMMAND: Command = Command::OfflineDataReport;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            trade_seq: r.bcd(TRADE_SEQ_LEN)?,
            id: r.bcd(PILE_ID_LEN)?,
            gun_id: r.u8()?,
            status: r.u8()?,
            reset: r.u8()?,
            plugged: r.u8()?,
            ov: r.u16()?,
            oc: r.u16()?,
            line_temp: r.u8()?,
            line_code: r.bcd(LINE_CODE_LEN)?,
            bp_top_temp: r.u8()?,
            accumulated_charging_time: r.u16()?,
            remaining_time: r.u16()?,
            charging_degrees: r.u32()?,
            lossy_charging_degrees: r.u32()?,
            charged_amount: r.u32()?,
            hardware_failure: r.u16()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.trade_seq, TRADE_SEQ_LEN)?
            .bcd(&self.id, PILE_ID_LEN)?
            .u8(self.gun_id)
            .u8(self.status)
            .u8(self.reset)
            .u8(self.plugged)
            .u16(self.ov)
            .u16(self.oc)
            .u8(self.line_temp)
            .bcd(&self.line_code, LINE_CODE_LEN)?
            .u8(self.bp_top_temp)
            .u16(self.accumulated_charging_time)
            .u16(self.remaining_time)
            .u32(self.charging_degrees)
            .u32(self.lossy_charging_degrees)
            .u32(self.charged_amount)
            .u16(self.hardware_failure);
        Ok(())
    }
}

/// Battery summary reported when a session ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingFinished {
    #[serde(default)]
    pub header: Header,
    pub trade_seq: String,
    pub id: String,
    pub gun_id: u8,
    pub end_soc: u8,
    pub bms_min_voltage: u16,
    pub bms_max_voltage: u16,
    pub bms_min_temp: u8,
    pub bms_max_temp: u8,
    pub charging_time: u16,
    pub output_energy: u16,
    pub charger_unit: u32,
}

impl Message for ChargingFinished {
    const COMMAND: Command = Command::ChargingFinished;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            trade_seq: r.bcd(TRADE_SEQ_LEN)?,
            id: r.bcd(PILE_ID_LEN)?,
            gun_id: r.u8()?,
            end_soc: r.u8()?,
            bms_min_voltage: r.u16()?,
            bms_max_voltage: r.u16()?,
            bms_min_temp: r.u8()?,
            bms_max_temp: r.u8()?,
            charging_time: r.u16()?,
            output_energy: r.u16()?,
            charger_unit: r.u32()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.trade_seq, TRADE_SEQ_LEN)?
            .bcd(&self.id, PILE_ID_LEN)?
            .u8(self.gun_id)
            .u8(self.end_soc)
            .u16(self.bms_min_voltage)
            .u16(self.bms_max_voltage)
            .u8(self.bms_min_temp)
            .u8(self.bms_max_temp)
            .u16(self.charging_time)
            .u16(self.output_energy)
            .u32(self.charger_unit);
        Ok(())
    }
}

// ============================================================================
// Remote bootstrap / shutdown (33 / 34 / 35 / 36)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBootstrapRequest {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub trade_seq: String,
    pub id: String,
    pub gun_id: u8,
    pub logical_card: String,
    pub physical_card: String,
    pub balance: u32,
}

impl Message for RemoteBootstrapRequest {
    const COMMAND: Command = Command::RemoteBootstrapRequest;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            trade_seq: r.bcd(TRADE_SEQ_LEN)?,
            id: r.bcd(PILE_ID_LEN)?,
            gun_id: r.u8()?,
            logical_card: r.bcd(CARD_LEN)?,
            physical_card: r.bcd(CARD_LEN)?,
            balance: r.u32()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.trade_seq, TRADE_SEQ_LEN)?
            .bcd(&self.id, PILE_ID_LEN)?
            .u8(self.gun_id)
            .bcd(&self.logical_card, CARD_LEN)?
            .bcd(&self.physical_card, CARD_LEN)?
            .u32(self.balance);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteBootstrapResponse {
    #[serde(default)]
    pub header: Header,
    pub trade_seq: String,
    pub id: String,
    pub gun_id: u8,
    pub result: u8,
    pub reason: u8,
}

impl Message for RemoteBootstrapResponse {
    const COMMAND: Command = Command::RemoteBootstrapResponse;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            trade_seq: r.bcd(TRADE_SEQ_LEN)?,
            id: r.bcd(PILE_ID_LEN)?,
            gun_id: r.u8()?,
            result: r.u8()?,
            reason: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.trade_seq, TRADE_SEQ_LEN)?
            .bcd(&self.id, PILE_ID_LEN)?
            .u8(self.gun_id)
            .u8(self.result)
            .u8(self.reason);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteShutdownRequest {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub id: String,
    pub gun_id: u8,
}

impl Message for RemoteShutdownRequest {
    const COMMAND: Command = Command::RemoteShutdownRequest;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            gun_id: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?.u8(self.gun_id);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteShutdownResponse {
    #[serde(default)]
    pub header: Header,
    pub id: String,
    pub gun_id: u8,
    pub result: u8,
    pub reason: u8,
}

impl Message for RemoteShutdownResponse {
    const COMMAND: Command = Command::RemoteShutdownResponse;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            gun_id: r.u8()?,
            result: r.u8()?,
            reason: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?
            .u8(self.gun_id)
            .u8(self.result)
            .u8(self.reason);
        Ok(())
    }
}

// ============================================================================
// Transaction record (3b / 40)
// ============================================================================

/// Usage within one tariff tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierUsage {
    pub price: u32,
    pub energy: u32,
    pub lossy_energy: u32,
    pub amount: u32,
}

/// Settled charging session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub header: Header,
    pub trade_seq: String,
    pub id: String,
    pub gun_id: u8,
    /// Epoch milliseconds
    pub start_at: i64,
    pub end_at: i64,
    pub sharp: TierUsage,
    pub peak: TierUsage,
    pub flat: TierUsage,
    pub valley: TierUsage,
    pub meter_start: u64,
    pub meter_end: u64,
    pub total_energy: u32,
    pub total_lossy_energy: u32,
    pub consumption_amount: u32,
    pub vin: String,
    pub trade_flag: u8,
    pub trade_at: i64,
    pub stop_reason: u8,
    pub physical_card: String,
}

impl Message for TransactionRecord {
    const COMMAND: Command = Command::TransactionRecord;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        let trade_seq = r.bcd(TRADE_SEQ_LEN)?;
        let id = r.bcd(PILE_ID_LEN)?;
        let gun_id = r.u8()?;
        let start_at = r.time()?;
        let end_at = r.time()?;

        let mut tiers = [TierUsage::default(); 4];
        for tier in tiers.iter_mut() {
            tier.price = r.u32()?;
            tier.energy = r.u32()?;
            tier.lossy_energy = r.u32()?;
            tier.amount = r.u32()?;
        }
        let [sharp, peak, flat, valley] = tiers;

        Ok(Self {
            header,
            trade_seq,
            id,
            gun_id,
            start_at,
            end_at,
            sharp,
            peak,
            flat,
            valley,
            meter_start: r.u40()?,
            meter_end: r.u40()?,
            total_energy: r.u32()?,
            total_lossy_energy: r.u32()?,
            consumption_amount: r.u32()?,
            vin: r.ascii(VIN_LEN)?,
            trade_flag: r.u8()?,
            trade_at: r.time()?,
            stop_reason: r.u8()?,
            physical_card: r.bcd(CARD_LEN)?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.trade_seq, TRADE_SEQ_LEN)?
            .bcd(&self.id, PILE_ID_LEN)?
            .u8(self.gun_id)
            .time(self.start_at)?
            .time(self.end_at)?;
        for tier in [self.sharp, self.peak, self.flat, self.valley] {
            w.u32(tier.price)
                .u32(tier.energy)
                .u32(tier.lossy_energy)
                .u32(tier.amount);
        }
        w.u40(self.meter_start)?
            .u40(self.meter_end)?
            .u32(self.total_energy)
            .u32(self.total_lossy_energy)
            .u32(self.consumption_amount)
            .ascii(&self.vin, VIN_LEN)?
            .u8(self.trade_flag)
            .time(self.trade_at)?
            .u8(self.stop_reason)
            .bcd(&self.physical_card, CARD_LEN)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecordConfirmed {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub trade_seq: String,
    /// 0 = upload succeeded, 1 = illegal bill
    pub result: u8,
}

impl TransactionRecordConfirmed {
    /// Pile id embedded in the leading digits of the trade sequence
    pub fn pile_id(&self) -> Option<&str> {
        self.trade_seq.get(..PILE_ID_LEN * 2)
    }
}

impl Message for TransactionRecordConfirmed {
    const COMMAND: Command = Command::TransactionRecordConfirmed;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            trade_seq: r.bcd(TRADE_SEQ_LEN)?,
            result: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.trade_seq, TRADE_SEQ_LEN)?.u8(self.result);
        Ok(())
    }
}

// ============================================================================
// Remote reboot (91 / 92)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRebootRequest {
    #[serde(default = "Header::generated")]
    pub header: Header,
    pub id: String,
    /// 1 = immediately, 2 = when idle
    pub control: u8,
}

impl Message for RemoteRebootRequest {
    const COMMAND: Command = Command::RemoteRebootRequest;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            control: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?.u8(self.control);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRebootResponse {
    #[serde(default)]
    pub header: Header,
    pub id: String,
    pub result: u8,
}

impl Message for RemoteRebootResponse {
    const COMMAND: Command = Command::RemoteRebootResponse;

    fn header(&self) -> Header {
        self.header
    }

    fn decode_body(header: Header, r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            header,
            id: r.bcd(PILE_ID_LEN)?,
            result: r.u8()?,
        })
    }

    fn encode_body(&self, w: &mut FieldWriter) -> Result<()> {
        w.bcd(&self.id, PILE_ID_LEN)?.u8(self.result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RawFrame;
    use crate::messages::test_util::roundtrip;
    use crate::messages::decode_message;

    const PILE: &str = "32010200000001";
    const TRADE: &str = "32010200000001012406151430000001";

    fn billing_model() -> BillingModel {
        BillingModel {
            code: 1,
            sharp: RatePair {
                electricity: 150_000,
                service: 40_000,
            },
            peak: RatePair {
                electricity: 120_000,
                service: 40_000,
            },
            flat: RatePair {
                electricity: 90_000,
                service: 40_000,
            },
            valley: RatePair {
                electricity: 60_000,
                service: 40_000,
            },
            loss_ratio: 0,
            periods: (0..RATE_PERIODS as u8).map(|i| i % 4).collect(),
        }
    }

    #[test]
    fn test_verification_response_golden_frame() {
        let bytes = roundtrip(VerificationResponse {
            header: Header::auto_response(),
            id: PILE.into(),
            result: true,
        });
        // marker, len 14, cmd 02, seq 0, plain, id, result, crc
        assert_eq!(
            &bytes[..15],
            &[
                0x5A, 0xA5, 0x0E, 0x00, 0x02, 0x00, 0x00, 0x00, 0x32, 0x01, 0x02, 0x00, 0x00,
                0x00, 0x01,
            ]
        );
        assert_eq!(bytes[15], 0x00);
        assert_eq!(bytes.len(), 18);
    }

    #[test]
    fn test_platform_roundtrips() {
        let header = Header::new(0x1234, false);

        roundtrip(Verification {
            header,
            id: PILE.into(),
            elc_type: 0,
            guns: 2,
            protocol_version: 0x0A,
            software_version: "V1.2.3".into(),
            network: 3,
            sim: "89860000000000000001".into(),
            operator: 1,
        });
        roundtrip(BillingModelVerification {
            header,
            id: PILE.into(),
            billing_model_code: 7,
        });
        roundtrip(BillingModelVerificationResponse {
            header,
            id: PILE.into(),
            billing_model_code: 7,
            result: false,
        });
        roundtrip(BillingModelRequest {
            header,
            id: PILE.into(),
        });
        roundtrip(BillingModelResponse {
            header,
            id: PILE.into(),
            billing_model: billing_model(),
        });
        roundtrip(SetBillingModelRequest {
            header,
            id: PILE.into(),
            billing_model: billing_model(),
        });
        roundtrip(SetBillingModelResponse {
            header,
            id: PILE.into(),
            result: 1,
        });
        roundtrip(RemoteBootstrapRequest {
            header,
            trade_seq: TRADE.into(),
            id: PILE.into(),
            gun_id: 1,
            logical_card: "1000000000000001".into(),
            physical_card: "00000000d14b0a54".into(),
            balance: 100_000,
        });
        roundtrip(RemoteBootstrapResponse {
            header,
            trade_seq: TRADE.into(),
            id: PILE.into(),
            gun_id: 1,
            result: 1,
            reason: 0,
        });
        roundtrip(RemoteShutdownRequest {
            header,
            id: PILE.into(),
            gun_id: 2,
        });
        roundtrip(RemoteShutdownResponse {
            header,
            id: PILE.into(),
            gun_id: 2,
            result: 1,
            reason: 0,
        });
        roundtrip(TransactionRecordConfirmed {
            header,
            trade_seq: TRADE.into(),
            result: 0,
        });
        roundtrip(RemoteRebootRequest {
            header,
            id: PILE.into(),
            control: 2,
        });
        roundtrip(RemoteRebootResponse {
            header,
            id: PILE.into(),
            result: 1,
        });
    }

    #[test]
    fn test_telemetry_roundtrips() {
        roundtrip(OfflineDataReport {
            header: Header::new(9, false),
            trade_seq: TRADE.into(),
            id: PILE.into(),
            gun_id: 1,
            status: 3,
            reset: 0,
            plugged: 1,
            ov: 3800,
            oc: 1250,
            line_temp: 75,
            line_code: "0000000000000000".into(),
            bp_top_temp: 80,
            accumulated_charging_time: 42,
            remaining_time: 18,
            charging_degrees: 152_300,
            lossy_charging_degrees: 153_000,
            charged_amount: 98_000,
            hardware_failure: 0,
        });
        roundtrip(ChargingFinished {
            header: Header::new(10, false),
            trade_seq: TRADE.into(),
            id: PILE.into(),
            gun_id: 1,
            end_soc: 95,
            bms_min_voltage: 330,
            bms_max_voltage: 420,
            bms_min_temp: 70,
            bms_max_temp: 82,
            charging_time: 60,
            output_energy: 523,
            charger_unit: 1,
        });
    }

    #[test]
    fn test_transaction_record_roundtrip() {
        let tier = TierUsage {
            price: 90_000,
            energy: 10_000,
            lossy_energy: 10_100,
            amount: 9_000,
        };
        roundtrip(TransactionRecord {
            header: Header::new(3, false),
            trade_seq: TRADE.into(),
            id: PILE.into(),
            gun_id: 1,
            start_at: 1_718_461_800_000,
            end_at: 1_718_465_400_000,
            sharp: TierUsage::default(),
            peak: tier,
            flat: tier,
            valley: TierUsage::default(),
            meter_start: 1_000_000,
            meter_end: 1_020_000,
            total_energy: 20_000,
            total_lossy_energy: 20_200,
            consumption_amount: 18_000,
            vin: "LSVAU2180N2183294".into(),
            trade_flag: 0x01,
            trade_at: 1_718_465_401_000,
            stop_reason: 0x40,
            physical_card: "0000000000000000".into(),
        });
    }

    #[test]
    fn test_decoded_verification_json_fields() {
        let msg = Verification {
            header: Header::new(7, false),
            id: PILE.into(),
            elc_type: 1,
            guns: 2,
            protocol_version: 0x0A,
            software_version: "V1.2.3".into(),
            network: 3,
            sim: "89860000000000000001".into(),
            operator: 1,
        };
        let raw = RawFrame::parse(&msg.encode().unwrap()).unwrap();
        let decoded: Verification = decode_message(&raw).unwrap();

        let json = serde_json::to_value(&decoded).unwrap();
        assert_eq!(json["header"]["sequence"], 7);
        assert_eq!(json["header"]["encrypted"], false);
        assert_eq!(json["id"], PILE);
        assert_eq!(json["elc_type"], 1);
        assert_eq!(json["guns"], 2);
        assert_eq!(json["software_version"], "V1.2.3");
        assert_eq!(json["sim"], "89860000000000000001");

        let back: Verification = serde_json::from_value(json).unwrap();
        assert_eq!(back, decoded);
    }

    #[test]
    fn test_confirmation_names_pile_from_trade_seq() {
        let msg = TransactionRecordConfirmed {
            header: Header::default(),
            trade_seq: TRADE.into(),
            result: 0,
        };
        assert_eq!(msg.pile_id(), Some(PILE));

        let short = TransactionRecordConfirmed {
            trade_seq: "0102".into(),
            ..msg
        };
        assert_eq!(short.pile_id(), None);
    }

    #[test]
    fn test_billing_model_needs_all_periods() {
        let mut model = billing_model();
        model.periods.pop();
        let msg = SetBillingModelRequest {
            header: Header::default(),
            id: PILE.into(),
            billing_model: model,
        };
        assert!(matches!(msg.encode(), Err(ProtoError::Encoding(_))));
    }

    #[test]
    fn test_bad_pile_id_rejected_on_encode() {
        let msg = RemoteRebootRequest {
            header: Header::default(),
            id: "not-bcd".into(),
            control: 1,
        };
        assert!(matches!(msg.encode(), Err(ProtoError::Encoding(_))));
    }

    #[test]
    fn test_truncated_payload_is_malformed() {
        let msg = RemoteShutdownResponse {
            header: Header::default(),
            id: PILE.into(),
            gun_id: 1,
            result: 0,
            reason: 0,
        };
        let full = msg.encode().unwrap();
        let raw = RawFrame::parse(&full).unwrap();

        // drop the reason byte and re-close the frame
        let short = crate::frame::encode_frame(
            Command::RemoteShutdownResponse,
            &raw.payload[..raw.payload.len() - 1],
        )
        .unwrap();
        let raw = RawFrame::parse(&short).unwrap();
        assert!(matches!(
            decode_message::<RemoteShutdownResponse>(&raw),
            Err(ProtoError::MalformedFrame(_))
        ));
    }
}
