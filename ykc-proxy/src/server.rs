//! TCP listener and per-connection tasks
//!
//! Each accepted socket gets its own task. Frames from one connection are
//! dispatched strictly in arrival order; a frame that fails to decode is
//! logged and the task keeps reading. When the connection closes, goes idle
//! past `read_timeout`, or the server shuts down, the registry entries it
//! still owns are evicted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};
use ykc_proto::primitives::hex_string;
use ykc_proto::FrameCodec;

use crate::config::ProxyConfig;
use crate::connection::Connection;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::forwarder::WebSocketForwarder;
use crate::registry::Registry;

/// Signals a running [`ProxyServer`] to stop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// Charging-pile TCP proxy
pub struct ProxyServer {
    listener: TcpListener,
    dispatcher: Dispatcher,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    max_frame_len: usize,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ProxyServer {
    /// Bind the listener described by `config`
    pub async fn bind(config: &ProxyConfig, dispatcher: Dispatcher) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            dispatcher,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            max_frame_len: config.max_frame_len,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Wire up registry, forwarder and dispatcher from `config`, then bind.
    ///
    /// A `forwarder_url` starts a [`WebSocketForwarder`] unless the options
    /// already carry a forwarder.
    pub async fn from_config(config: ProxyConfig) -> Result<Self> {
        let mut options = config.options.clone();

        if options.forwarder.is_none() {
            if let Some(url) = &config.forwarder_url {
                let (forwarder, _sender) = WebSocketForwarder::spawn(
                    url.clone(),
                    config.forwarder_queue,
                    config.reconnect_delay,
                    config.max_reconnect_delay,
                );
                options = options.with_forwarder(Arc::new(forwarder));
            }
        }

        let dispatcher = Dispatcher::new(options, Arc::new(Registry::new()));
        Self::bind(&config, dispatcher).await
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.dispatcher.registry().clone()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Accept connections until shut down
    pub async fn run(self) -> Result<()> {
        let mut shutdown = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!(peer = %peer, "Device connected");
                            let session = Session {
                                dispatcher: self.dispatcher.clone(),
                                read_timeout: self.read_timeout,
                                write_timeout: self.write_timeout,
                                max_frame_len: self.max_frame_len,
                                shutdown: self.shutdown_rx.clone(),
                            };
                            tokio::spawn(session.run(stream, peer));
                        }
                        Err(e) => {
                            error!("Accept failed: {}", e);
                        }
                    }
                }
            }
        }
    }
}

/// State owned by one connection task
struct Session {
    dispatcher: Dispatcher,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    max_frame_len: usize,
    shutdown: watch::Receiver<bool>,
}

impl Session {
    async fn run(mut self, stream: TcpStream, peer: SocketAddr) {
        let (reader, writer) = stream.into_split();
        let conn = Arc::new(
            Connection::new(writer, Some(peer)).with_write_timeout(self.write_timeout),
        );
        let codec = FrameCodec::with_max_frame_len(self.max_frame_len);
        let mut frames = FramedRead::new(reader, codec);

        loop {
            let next = tokio::select! {
                _ = self.shutdown.changed() => break,
                next = next_frame(&mut frames, self.read_timeout) => next,
            };

            let raw = match next {
                Err(_) => {
                    info!(peer = %peer, "Read timeout, closing connection");
                    break;
                }
                Ok(None) => {
                    info!(peer = %peer, "Device disconnected");
                    break;
                }
                Ok(Some(Err(e))) => {
                    warn!(peer = %peer, error = %e, "Read failed, closing connection");
                    break;
                }
                Ok(Some(Ok(raw))) => raw,
            };

            debug!(
                peer = %peer,
                code = %format!("{:02x}", raw.code),
                bytes = %hex_string(&raw.to_bytes()),
                "Frame received"
            );

            if let Err(e) = self.dispatcher.dispatch(&raw, &conn).await {
                warn!(peer = %peer, error = %e, "Dropping frame");
            }
        }

        let evicted = self.dispatcher.registry().evict_connection(conn.id());
        if !evicted.is_empty() {
            info!(peer = %peer, devices = ?evicted, "Unregistered devices");
        }
        let _ = conn.shutdown().await;
    }
}

async fn next_frame<S>(
    frames: &mut S,
    read_timeout: Option<Duration>,
) -> std::result::Result<Option<S::Item>, tokio::time::error::Elapsed>
where
    S: StreamExt + Unpin,
{
    match read_timeout {
        Some(limit) => tokio::time::timeout(limit, frames.next()).await,
        None => Ok(frames.next().await),
    }
}
