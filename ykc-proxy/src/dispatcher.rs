//! Per-frame routing
//!
//! | Code | Action |
//! |------|--------|
//! | `01` | register pile, auto-answer `02` or forward |
//! | `05` | auto-answer `06` or forward |
//! | `3b` | auto-confirm with `40` or forward |
//! | `09 13 19 33 35 57 88 91` | forward |
//! | `81` | register IMEI, forward, write the login ack |
//! | `82` | write heartbeat response |
//! | `83 84 85` | write response mirroring the request header |
//!
//! Anything else is logged and dropped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use ykc_proto::primitives::hex_string;
use ykc_proto::{
    decode_inbound, BillingModelVerificationResponse, Command, Header, HeartbeatResponse, Inbound,
    Message, ProtoError, RawFrame, RemoteStartResponse, RemoteStopResponse,
    SubmitFinalStatusResponse, TransactionRecordConfirmed, VerificationResponse, LOGIN_ACK,
};

use crate::config::Options;
use crate::connection::Connection;
use crate::error::Result;
use crate::outbound::Outbound;
use crate::registry::Registry;

/// Result byte the proxy writes into station-family replies
const ACCEPTED: u8 = 0x00;

/// Routes decoded frames to auto-responses, registration and forwarding
#[derive(Debug, Clone)]
pub struct Dispatcher {
    options: Options,
    outbound: Outbound,
}

impl Dispatcher {
    pub fn new(options: Options, registry: Arc<Registry>) -> Self {
        Self {
            options,
            outbound: Outbound::new(registry),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.outbound.registry()
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Handle one frame read from `conn`.
    ///
    /// Decode failures are returned; forwarding and auto-response failures
    /// are logged here and never end the connection.
    pub async fn dispatch(&self, raw: &RawFrame, conn: &Arc<Connection>) -> Result<()> {
        let command = match Command::from_u8(raw.code) {
            Ok(command) => command,
            Err(_) => {
                warn!(code = %format!("{:02x}", raw.code), "Unknown command, ignoring");
                return Ok(());
            }
        };

        let msg = match decode_inbound(raw) {
            Ok(msg) => msg,
            Err(ProtoError::NotInbound(code)) => {
                warn!(
                    code = %format!("{:02x}", code),
                    "Outbound-only command from device, ignoring"
                );
                return Ok(());
            }
            Err(e) => {
                if command == Command::DeviceLogin {
                    error!(error = %e, "Rejecting device login, no ack sent");
                }
                return Err(e.into());
            }
        };

        debug!(
            command = %command,
            device_id = msg.device_id().unwrap_or("-"),
            "Received"
        );

        match msg {
            Inbound::Verification(m) => {
                self.register(&m.id, conn);
                if self.options.auto_verification {
                    let resp = VerificationResponse {
                        header: Header::auto_response(),
                        id: m.id.clone(),
                        result: true,
                    };
                    self.auto_respond(self.outbound.respond_verification(&resp).await, command);
                } else {
                    self.forward(command, &m).await;
                }
            }
            Inbound::BillingModelVerification(m) => {
                if self.options.auto_billing_model_verify {
                    let resp = BillingModelVerificationResponse {
                        header: Header::auto_response(),
                        id: m.id.clone(),
                        billing_model_code: m.billing_model_code,
                        result: true,
                    };
                    self.auto_respond(
                        self.outbound.respond_billing_model_verification(&resp).await,
                        command,
                    );
                } else {
                    self.forward(command, &m).await;
                }
            }
            Inbound::TransactionRecord(m) => {
                if self.options.auto_transaction_record_confirm {
                    let resp = TransactionRecordConfirmed {
                        header: Header::auto_response(),
                        trade_seq: m.trade_seq.clone(),
                        result: ACCEPTED,
                    };
                    self.auto_respond(self.outbound.send(&m.id, &resp).await, command);
                } else {
                    self.forward(command, &m).await;
                }
            }
            Inbound::DeviceLogin(m) => {
                self.register(&m.imei, conn);
                self.forward(command, &m).await;
                self.reply(conn, &LOGIN_ACK, command).await;
            }
            Inbound::Heartbeat(m) => {
                let resp = HeartbeatResponse { header: m.header };
                self.reply_with(conn, &resp).await?;
            }
            Inbound::RemoteStart(m) => {
                let resp = RemoteStartResponse {
                    header: m.header,
                    port: m.port,
                    order_number: m.order_number,
                    start_method: m.start_method,
                    result: ACCEPTED,
                };
                self.reply_with(conn, &resp).await?;
            }
            Inbound::RemoteStop(m) => {
                let resp = RemoteStopResponse {
                    header: m.header,
                    port: m.port,
                    order_number: m.order_number,
                    result: ACCEPTED,
                };
                self.reply_with(conn, &resp).await?;
            }
            Inbound::SubmitFinalStatus(m) => {
                let resp = SubmitFinalStatusResponse {
                    header: m.header,
                    result: ACCEPTED,
                };
                self.reply_with(conn, &resp).await?;
            }
            Inbound::BillingModelRequest(m) => self.forward(command, &m).await,
            Inbound::OfflineDataReport(m) => self.forward(command, &m).await,
            Inbound::ChargingFinished(m) => self.forward(command, &m).await,
            Inbound::RemoteBootstrapResponse(m) => self.forward(command, &m).await,
            Inbound::RemoteShutdownResponse(m) => self.forward(command, &m).await,
            Inbound::SetBillingModelResponse(m) => self.forward(command, &m).await,
            Inbound::ChargingPortData(m) => self.forward(command, &m).await,
            Inbound::RemoteRebootResponse(m) => self.forward(command, &m).await,
        }

        Ok(())
    }

    fn register(&self, device_id: &str, conn: &Arc<Connection>) {
        if let Some(previous) = self.registry().store(device_id, conn.clone()) {
            if previous.id() != conn.id() {
                info!(
                    device_id = %device_id,
                    peer = ?conn.peer(),
                    "Device reconnected, replacing connection"
                );
            }
        } else {
            info!(device_id = %device_id, peer = ?conn.peer(), "Device registered");
        }
    }

    /// Publish under the command's topic; failures are logged only
    async fn forward<T: Serialize>(&self, command: Command, msg: &T) {
        let Some(forwarder) = &self.options.forwarder else {
            return;
        };

        let payload = match serde_json::to_value(msg) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    command = %command,
                    error = %e,
                    "Failed to serialize message for forwarding"
                );
                return;
            }
        };

        if let Err(e) = forwarder.publish(&command.topic(), payload).await {
            error!(command = %command, error = %e, "Failed to forward message");
        }
    }

    fn auto_respond(&self, result: Result<()>, command: Command) {
        if let Err(e) = result {
            error!(command = %command, error = %e, "Auto-response failed");
        }
    }

    /// Encode and write a reply on the connection the request came from
    async fn reply_with<M: Message>(&self, conn: &Connection, msg: &M) -> Result<()> {
        let bytes = msg.encode()?;
        self.reply(conn, &bytes, M::COMMAND).await;
        Ok(())
    }

    async fn reply(&self, conn: &Connection, bytes: &[u8], command: Command) {
        match conn.write_frame(bytes).await {
            Ok(()) => debug!(
                connection = %conn.id(),
                peer = ?conn.peer(),
                command = %command,
                bytes = %hex_string(bytes),
                "Reply sent"
            ),
            Err(e) => error!(
                connection = %conn.id(),
                peer = ?conn.peer(),
                command = %command,
                error = %e,
                "Failed to write reply"
            ),
        }
    }
}
