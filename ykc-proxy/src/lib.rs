//! # YKC Proxy
//!
//! TCP proxy that terminates connections from charging piles and stations,
//! answers the protocol's housekeeping frames itself and forwards everything
//! else to a pub/sub backend.
//!
//! ## Architecture
//!
//! ```text
//!  Piles / stations
//!       │ TCP, binary frames
//!       ▼
//! ┌──────────────────────────────────────┐
//! │  ProxyServer (task per connection)   │
//! │    FrameCodec ─► Dispatcher          │
//! │                   │   │   │          │
//! │          auto-reply   │   Forwarder ─┼──► WebSocket backend
//! │                   Registry           │
//! │                       ▲              │
//! │   admin JSON ─► Outbound ────────────┼──► pile
//! └──────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use ykc_proxy::{Options, ProxyConfig, ProxyServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProxyConfig::default()
//!         .with_options(Options::new().with_auto_verification(true))
//!         .with_forwarder_url("ws://localhost:9001/ingest");
//!
//!     let server = ProxyServer::from_config(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod forwarder;
pub mod outbound;
pub mod registry;
pub mod server;

#[cfg(test)]
mod test_util;

pub use config::{Options, ProxyConfig};
pub use connection::Connection;
pub use dispatcher::Dispatcher;
pub use error::{ForwardError, ProxyError, Result};
pub use forwarder::{ChannelForwarder, Forwarder, WebSocketForwarder};
pub use outbound::{Outbound, OutboundCommand};
pub use registry::Registry;
pub use server::{ProxyServer, ShutdownHandle};

// Re-export the wire codec
pub use ykc_proto;
