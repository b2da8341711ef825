//! Testing utilities for transport implementations.

use crate::traits::{ByteTransport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Mock transport for testing
pub struct MockTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    recv_queue: Mutex<VecDeque<Vec<u8>>>,
    connected: AtomicBool,
    fail_sends: AtomicBool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            recv_queue: Mutex::new(VecDeque::new()),
            connected: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Inject a frame into the receive queue
    pub fn inject_recv(&self, frame: Vec<u8>) {
        self.recv_queue.lock().push_back(frame);
    }

    /// Get sent frames
    pub fn get_sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Clear sent frames
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }

    /// Make subsequent sends fail until cleared
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Simulate disconnect
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// Simulate connect
    pub fn connect(&self) {
        self.connected.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl ByteTransport for MockTransport {
    async fn recv(
        &self,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_connected() {
                return Err(TransportError::Disconnected);
            }
            if let Some(mut frame) = self.recv_queue.lock().pop_front() {
                frame.truncate(max_len);
                return Ok(Some(frame));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(Duration::from_millis(1)).await;
        }
    }

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(TransportError::Other("injected send failure".to_string()));
        }
        self.sent.lock().push(frame.to_vec());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Loopback transport for local testing
pub struct LoopbackTransport {
    inbox: Arc<LoopbackEnd>,
    peer: Arc<LoopbackEnd>,
}

struct LoopbackEnd {
    queue: Mutex<VecDeque<Vec<u8>>>,
    connected: AtomicBool,
}

impl LoopbackTransport {
    /// Create a connected pair; frames sent on one end arrive at the other.
    pub fn pair() -> (Self, Self) {
        let end1 = Arc::new(LoopbackEnd {
            queue: Mutex::new(VecDeque::new()),
            connected: AtomicBool::new(true),
        });
        let end2 = Arc::new(LoopbackEnd {
            queue: Mutex::new(VecDeque::new()),
            connected: AtomicBool::new(true),
        });

        let transport1 = Self {
            inbox: end1.clone(),
            peer: end2.clone(),
        };
        let transport2 = Self {
            inbox: end2,
            peer: end1,
        };

        (transport1, transport2)
    }

    /// Close this end; the peer observes a disconnect.
    pub fn close(&self) {
        self.inbox.connected.store(false, Ordering::Relaxed);
        self.peer.connected.store(false, Ordering::Relaxed);
    }
}

#[async_trait]
impl ByteTransport for LoopbackTransport {
    async fn recv(
        &self,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(mut frame) = self.inbox.queue.lock().pop_front() {
                frame.truncate(max_len);
                return Ok(Some(frame));
            }
            if !self.is_connected() {
                return Err(TransportError::Disconnected);
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(Duration::from_millis(1)).await;
        }
    }

    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.peer.queue.lock().push_back(frame.to_vec());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inbox.connected.load(Ordering::Relaxed)
    }
}
