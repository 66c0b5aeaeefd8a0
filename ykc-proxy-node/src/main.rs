//! YKC Proxy Node - CLI for the charging-pile proxy
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (0.0.0.0:27001, nothing auto-answered, no forwarder)
//! ykc-proxy-node
//!
//! # Answer verification and billing checks locally, forward the rest
//! ykc-proxy-node --auto-verification --auto-billing-model-verify \
//!     --forwarder-url ws://localhost:9001/ingest
//!
//! # Debug logging, no idle timeout
//! ykc-proxy-node --log-level debug --read-timeout 0
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use ykc_proxy::{Options, ProxyConfig, ProxyServer};

/// TCP proxy for YKC charging piles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address piles connect to
    #[arg(short, long, default_value = "0.0.0.0:27001")]
    listen: SocketAddr,

    /// WebSocket endpoint receiving forwarded messages
    #[arg(long)]
    forwarder_url: Option<String>,

    /// Forwarder queue capacity
    #[arg(long, default_value = "1024")]
    forwarder_queue: usize,

    /// Answer verification (01) locally
    #[arg(long)]
    auto_verification: bool,

    /// Answer billing-model verification (05) locally
    #[arg(long)]
    auto_billing_model_verify: bool,

    /// Confirm transaction records (3b) locally
    #[arg(long)]
    auto_transaction_record_confirm: bool,

    /// Idle read timeout in seconds, 0 disables
    #[arg(long, default_value = "180")]
    read_timeout: u64,

    /// Write timeout in seconds for a pile that stops reading, 0 disables
    #[arg(long, default_value = "10")]
    write_timeout: u64,

    /// Largest accepted frame in bytes
    #[arg(long, default_value = "1024")]
    max_frame_len: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = Options::new()
        .with_auto_verification(args.auto_verification)
        .with_auto_billing_model_verify(args.auto_billing_model_verify)
        .with_auto_transaction_record_confirm(args.auto_transaction_record_confirm);

    let read_timeout = match args.read_timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let write_timeout = match args.write_timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    let mut config = ProxyConfig::new(args.listen)
        .with_read_timeout(read_timeout)
        .with_write_timeout(write_timeout)
        .with_max_frame_len(args.max_frame_len)
        .with_forwarder_queue(args.forwarder_queue)
        .with_options(options);

    if let Some(url) = &args.forwarder_url {
        config = config.with_forwarder_url(url);
        info!("Forwarding to {}", url);
    }

    info!(options = ?config.options, "Starting YKC proxy...");

    let server = ProxyServer::from_config(config).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            shutdown.shutdown();
        }
    });

    server.run().await?;

    Ok(())
}
