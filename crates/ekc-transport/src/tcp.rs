//! TCP binding of the byte-channel trait.

use crate::traits::{ByteTransport, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout as tokio_timeout;

/// A connected TCP stream presented as a raw frame channel.
///
/// One `read` on the socket yields one command frame, mirroring the
/// one-command-per-receive contract of the serial link this stands in for.
pub struct TcpByteTransport {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    connected: AtomicBool,
}

impl TcpByteTransport {
    /// Wrap an accepted or connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            connected: AtomicBool::new(true),
        }
    }

    /// Connect to a remote custodian endpoint.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(stream))
    }
}

#[async_trait]
impl ByteTransport for TcpByteTransport {
    async fn recv(
        &self,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }

        let mut reader = self.reader.lock().await;
        let mut buf = vec![0u8; max_len];

        match tokio_timeout(timeout, reader.read(&mut buf)).await {
            // Timeout elapsed with no data: idle, not an error.
            Err(_) => Ok(None),
            Ok(Ok(0)) => {
                self.connected.store(false, Ordering::Relaxed);
                Err(TransportError::Disconnected)
            }
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
            Ok(Err(e)) => {
                self.connected.store(false, Ordering::Relaxed);
                Err(TransportError::Io(e))
            }
        }
    }

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(frame).await {
            self.connected.store(false, Ordering::Relaxed);
            return Err(TransportError::Io(e));
        }
        if let Err(e) = writer.flush().await {
            self.connected.store(false, Ordering::Relaxed);
            return Err(TransportError::Io(e));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
