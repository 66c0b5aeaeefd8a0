//! Best-effort publishing of decoded device messages
//!
//! The dispatcher hands every forwarded message to a [`Forwarder`] under a
//! topic equal to the command code (`"01"`, `"3b"`, ...). Failures are the
//! caller's to log; nothing here retries a single publish.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::SinkExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::ForwardError;

/// Sink for forwarded messages
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), ForwardError>;
}

/// Envelope written to the WebSocket endpoint
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    topic: &'a str,
    payload: Value,
}

/// Publishes `{"topic": .., "payload": ..}` text frames to a WebSocket
/// endpoint, reconnecting with exponential backoff.
pub struct WebSocketForwarder {
    queue: mpsc::Sender<String>,
}

impl WebSocketForwarder {
    /// Start the sender task. It exits once the forwarder is dropped.
    pub fn spawn(
        url: impl Into<String>,
        capacity: usize,
        reconnect_delay: Duration,
        max_reconnect_delay: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_sender(url.into(), rx, reconnect_delay, max_reconnect_delay));
        (Self { queue: tx }, handle)
    }
}

#[async_trait]
impl Forwarder for WebSocketForwarder {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), ForwardError> {
        let text = serde_json::to_string(&Envelope { topic, payload })?;
        self.queue.try_send(text).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ForwardError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ForwardError::Closed,
        })
    }
}

async fn run_sender(
    url: String,
    mut rx: mpsc::Receiver<String>,
    initial_delay: Duration,
    max_delay: Duration,
) {
    let mut reconnect_delay = initial_delay;
    // message that failed mid-send, retried after reconnecting
    let mut pending: Option<String> = None;

    loop {
        info!("Connecting to forwarder: {}", url);

        let mut ws = match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                info!("Forwarder connected to {}", url);
                reconnect_delay = initial_delay;
                ws
            }
            Err(e) => {
                error!("Forwarder connection failed: {}", e);
                info!("Reconnecting in {:?}", reconnect_delay);
                tokio::time::sleep(reconnect_delay).await;
                reconnect_delay = std::cmp::min(reconnect_delay * 2, max_delay);
                continue;
            }
        };

        loop {
            let text = match pending.take() {
                Some(text) => text,
                None => match rx.recv().await {
                    Some(text) => text,
                    None => {
                        debug!("Forwarder queue closed, stopping sender");
                        let _ = ws.close(None).await;
                        return;
                    }
                },
            };

            debug!("Forwarding: {}", text);

            if let Err(e) = ws.send(Message::Text(text.clone().into())).await {
                warn!("Failed to send to forwarder: {}", e);
                pending = Some(text);
                break;
            }
        }
    }
}

/// Delivers messages to an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelForwarder {
    tx: mpsc::UnboundedSender<(String, Value)>,
}

impl ChannelForwarder {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Forwarder for ChannelForwarder {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), ForwardError> {
        self.tx
            .send((topic.to_string(), payload))
            .map_err(|_| ForwardError::Closed)
    }
}
