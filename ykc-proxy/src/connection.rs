//! Write side of one device connection

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use uuid::Uuid;

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Shared handle for writing frames to a connected device.
///
/// Writes are serialized, so an auto-response and an administrator command
/// racing on the same connection never interleave on the wire.
pub struct Connection {
    id: Uuid,
    peer: Option<SocketAddr>,
    writer: Mutex<Writer>,
    write_timeout: Option<Duration>,
}

impl Connection {
    pub fn new<W>(writer: W, peer: Option<SocketAddr>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            peer,
            writer: Mutex::new(Box::new(writer)),
            write_timeout: None,
        }
    }

    /// Fail a write that cannot complete within `timeout`
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Unique per accepted socket
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Write one complete frame.
    ///
    /// With a write timeout set, a peer that stops reading releases the
    /// write lock with `TimedOut` instead of holding it forever.
    pub async fn write_frame(&self, frame: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        let write = async {
            writer.write_all(frame).await?;
            writer.flush().await
        };

        match self.write_timeout {
            Some(limit) => tokio::time::timeout(limit, write)
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timed out"))?,
            None => write.await,
        }
    }

    /// Close the write half
    pub async fn shutdown(&self) -> io::Result<()> {
        self.writer.lock().await.shutdown().await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}
