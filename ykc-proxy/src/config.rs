//! Configuration for the proxy
//!
//! [`ProxyConfig`] covers the listener and forwarder; [`Options`] holds the
//! dispatcher policy flags. Both are fixed once the server starts.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ykc_proto::DEFAULT_MAX_FRAME_LEN;

use crate::forwarder::Forwarder;

/// Dispatcher policy
#[derive(Clone, Default)]
pub struct Options {
    /// Answer verification (01) locally instead of forwarding
    pub auto_verification: bool,

    /// Answer billing-model verification (05) locally instead of forwarding
    pub auto_billing_model_verify: bool,

    /// Confirm transaction records (3b) locally instead of forwarding
    pub auto_transaction_record_confirm: bool,

    /// Where forwarded messages go; `None` drops them
    pub forwarder: Option<Arc<dyn Forwarder>>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("auto_verification", &self.auto_verification)
            .field("auto_billing_model_verify", &self.auto_billing_model_verify)
            .field("auto_transaction_record_confirm", &self.auto_transaction_record_confirm)
            .field("forwarder", &self.forwarder.is_some())
            .finish()
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_verification(mut self, enabled: bool) -> Self {
        self.auto_verification = enabled;
        self
    }

    pub fn with_auto_billing_model_verify(mut self, enabled: bool) -> Self {
        self.auto_billing_model_verify = enabled;
        self
    }

    pub fn with_auto_transaction_record_confirm(mut self, enabled: bool) -> Self {
        self.auto_transaction_record_confirm = enabled;
        self
    }

    /// Set forwarder
    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }
}

/// Complete proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// TCP address piles connect to
    pub listen_addr: SocketAddr,

    /// Close a connection after this long without a frame
    pub read_timeout: Option<Duration>,

    /// Fail a write to a pile that stalls this long
    pub write_timeout: Option<Duration>,

    /// Largest frame accepted from a pile
    pub max_frame_len: usize,

    /// Dispatcher policy
    pub options: Options,

    /// WebSocket endpoint for forwarded messages
    pub forwarder_url: Option<String>,

    /// Messages buffered while the forwarder is disconnected
    pub forwarder_queue: usize,

    /// Initial forwarder reconnect delay
    pub reconnect_delay: Duration,

    /// Maximum forwarder reconnect delay (exponential backoff cap)
    pub max_reconnect_delay: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 27001)),
            read_timeout: Some(Duration::from_secs(180)),
            write_timeout: Some(Duration::from_secs(10)),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            options: Options::default(),
            forwarder_url: None,
            forwarder_queue: 1024,
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
        }
    }
}

impl ProxyConfig {
    /// Create config listening on `listen_addr`
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    /// Set idle read timeout, `None` waits forever
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set write timeout, `None` waits forever
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// Set dispatcher policy
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Forward to a WebSocket endpoint
    pub fn with_forwarder_url(mut self, url: impl Into<String>) -> Self {
        self.forwarder_url = Some(url.into());
        self
    }

    pub fn with_forwarder_queue(mut self, capacity: usize) -> Self {
        self.forwarder_queue = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.listen_addr.port(), 27001);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(180)));
        assert_eq!(config.write_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.max_frame_len, 1024);
        assert!(!config.options.auto_verification);
        assert!(config.options.forwarder.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ProxyConfig::new("127.0.0.1:9000".parse().unwrap())
            .with_read_timeout(None)
            .with_write_timeout(Some(Duration::from_secs(2)))
            .with_max_frame_len(512)
            .with_forwarder_url("ws://localhost:9001/ingest")
            .with_options(
                Options::new()
                    .with_auto_verification(true)
                    .with_auto_transaction_record_confirm(true),
            );

        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.write_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.max_frame_len, 512);
        assert_eq!(config.forwarder_url.as_deref(), Some("ws://localhost:9001/ingest"));
        assert!(config.options.auto_verification);
        assert!(!config.options.auto_billing_model_verify);
        assert!(config.options.auto_transaction_record_confirm);
    }
}
