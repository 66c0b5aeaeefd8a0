//! Administrator-initiated commands
//!
//! Every send resolves the device through the [`Registry`], encodes the typed
//! message and writes it under the connection's write lock. An unknown device
//! and a failed write are reported as distinct errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use ykc_proto::primitives::hex_string;
use ykc_proto::{
    BillingModelResponse, BillingModelVerificationResponse, Message, ProtoError,
    RemoteBootstrapRequest, RemoteRebootRequest, RemoteShutdownRequest, SetBillingModelRequest,
    TransactionRecordConfirmed, VerificationResponse,
};

use crate::error::{ProxyError, Result};
use crate::registry::Registry;

/// Sends typed messages to registered devices
#[derive(Debug, Clone)]
pub struct Outbound {
    registry: Arc<Registry>,
}

impl Outbound {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Encode `msg` and write it to the connection registered as `device_id`
    pub async fn send<M: Message>(&self, device_id: &str, msg: &M) -> Result<()> {
        let conn = self.registry.get(device_id)?;
        let bytes = msg.encode()?;

        conn.write_frame(&bytes).await.map_err(|source| {
            error!(
                device_id = %device_id,
                command = %M::COMMAND,
                error = %source,
                "Write failed"
            );
            ProxyError::Write {
                device_id: device_id.to_string(),
                source,
            }
        })?;

        debug!(
            device_id = %device_id,
            command = %M::COMMAND,
            bytes = %hex_string(&bytes),
            "Message sent"
        );
        Ok(())
    }

    /// 02
    pub async fn respond_verification(&self, msg: &VerificationResponse) -> Result<()> {
        self.send(&msg.id, msg).await
    }

    /// 06
    pub async fn respond_billing_model_verification(
        &self,
        msg: &BillingModelVerificationResponse,
    ) -> Result<()> {
        self.send(&msg.id, msg).await
    }

    /// 0a
    pub async fn send_billing_model(&self, msg: &BillingModelResponse) -> Result<()> {
        self.send(&msg.id, msg).await
    }

    /// 34
    pub async fn send_remote_bootstrap(&self, msg: &RemoteBootstrapRequest) -> Result<()> {
        self.send(&msg.id, msg).await
    }

    /// 36
    pub async fn send_remote_shutdown(&self, msg: &RemoteShutdownRequest) -> Result<()> {
        self.send(&msg.id, msg).await
    }

    /// 40, routed by the pile id leading the trade sequence
    pub async fn confirm_transaction_record(&self, msg: &TransactionRecordConfirmed) -> Result<()> {
        let device_id = msg.pile_id().ok_or_else(|| {
            ProtoError::encoding(format!("trade sequence {:?} names no pile", msg.trade_seq))
        })?;
        self.send(device_id, msg).await
    }

    /// 58
    pub async fn send_set_billing_model(&self, msg: &SetBillingModelRequest) -> Result<()> {
        self.send(&msg.id, msg).await
    }

    /// 92
    pub async fn send_remote_reboot(&self, msg: &RemoteRebootRequest) -> Result<()> {
        self.send(&msg.id, msg).await
    }

    /// Route an administrative command to its send operation
    pub async fn execute(&self, command: &OutboundCommand) -> Result<()> {
        match command {
            OutboundCommand::VerificationResponse(m) => self.respond_verification(m).await,
            OutboundCommand::BillingModelVerificationResponse(m) => {
                self.respond_billing_model_verification(m).await
            }
            OutboundCommand::BillingModelResponse(m) => self.send_billing_model(m).await,
            OutboundCommand::RemoteBootstrap(m) => self.send_remote_bootstrap(m).await,
            OutboundCommand::RemoteShutdown(m) => self.send_remote_shutdown(m).await,
            OutboundCommand::TransactionRecordConfirmed(m) => {
                self.confirm_transaction_record(m).await
            }
            OutboundCommand::SetBillingModel(m) => self.send_set_billing_model(m).await,
            OutboundCommand::RemoteReboot(m) => self.send_remote_reboot(m).await,
        }
    }
}

/// Request body accepted from an administrative surface.
///
/// ```json
/// {"command": "remote_reboot", "id": "32010200000001", "control": 1}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OutboundCommand {
    VerificationResponse(VerificationResponse),
    BillingModelVerificationResponse(BillingModelVerificationResponse),
    BillingModelResponse(BillingModelResponse),
    RemoteBootstrap(RemoteBootstrapRequest),
    RemoteShutdown(RemoteShutdownRequest),
    TransactionRecordConfirmed(TransactionRecordConfirmed),
    SetBillingModel(SetBillingModelRequest),
    RemoteReboot(RemoteRebootRequest),
}

impl OutboundCommand {
    /// Parse and validate a request body
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(ProxyError::InvalidCommand)
    }
}
