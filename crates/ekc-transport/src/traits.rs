//! Byte-channel trait for the command request/response stream.

use async_trait::async_trait;
use std::time::Duration;

/// Common transport error type
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport disconnected")]
    Disconnected,

    #[error("operation timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Raw duplex byte channel carrying one command frame per receive.
///
/// The protocol has no framing layer: whatever one receive call returns is
/// treated as one complete command, bounded by `max_len`.
#[async_trait]
pub trait ByteTransport: Send + Sync {
    /// Receive the next frame, up to `max_len` bytes.
    ///
    /// Returns `Ok(None)` when `timeout` elapses with nothing to read (idle,
    /// not an error) and `Err(Disconnected)` once the peer has gone away.
    async fn recv(
        &self,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError>;

    /// Send a response frame.
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Check if the channel is still usable.
    fn is_connected(&self) -> bool;
}
