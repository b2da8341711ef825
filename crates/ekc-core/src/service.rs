//! The custodian service loop.
//!
//! A single sequential cycle, repeated forever: block on the transport with
//! a bounded timeout, classify the frame, run the matching handler, write
//! the fixed-size response. One request is processed to completion before
//! the next read; nothing else touches the keypair after initialization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ekc_transport::{ByteTransport, TransportError};

use crate::errors::CoreError;
use crate::handlers::{self, KeyAgreementStrategy};
use crate::keys::Keypair;
use crate::protocol::{classify, Command, ProtocolError, UnknownCommandPolicy, MAX_FRAME_LEN};

/// Default receive timeout for one idle cycle.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Statistics for the service loop.
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// Command frames received
    pub received: AtomicU64,
    /// Responses written successfully
    pub answered: AtomicU64,
    /// Requests dropped (malformed or rejected unknown commands)
    pub rejected: AtomicU64,
    /// Response writes that failed
    pub write_failures: AtomicU64,
    /// Idle receive timeouts
    pub idle_timeouts: AtomicU64,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            answered: self.answered.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            idle_timeouts: self.idle_timeouts.load(Ordering::Relaxed),
        }
    }

    fn inc_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_answered(&self) {
        self.answered.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_idle_timeouts(&self) {
        self.idle_timeouts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of service statistics at a point in time.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServiceStatsSnapshot {
    pub received: u64,
    pub answered: u64,
    pub rejected: u64,
    pub write_failures: u64,
    pub idle_timeouts: u64,
}

/// The command dispatcher and request/response loop.
pub struct CustodianService {
    keypair: Arc<Keypair>,
    unknown_command: UnknownCommandPolicy,
    key_agreement: KeyAgreementStrategy,
    read_timeout: Duration,
    max_frame_len: usize,
    stats: Arc<ServiceStats>,
}

impl CustodianService {
    /// Create a service over an initialized keypair with default policies.
    pub fn new(keypair: Arc<Keypair>) -> Self {
        Self {
            keypair,
            unknown_command: UnknownCommandPolicy::default(),
            key_agreement: KeyAgreementStrategy::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_len: MAX_FRAME_LEN,
            stats: Arc::new(ServiceStats::new()),
        }
    }

    /// Set the unknown-command policy.
    pub fn with_unknown_command_policy(mut self, policy: UnknownCommandPolicy) -> Self {
        self.unknown_command = policy;
        self
    }

    /// Set the key-agreement strategy.
    pub fn with_key_agreement_strategy(mut self, strategy: KeyAgreementStrategy) -> Self {
        self.key_agreement = strategy;
        self
    }

    /// Set the receive timeout for one cycle.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the inbound frame bound.
    pub fn with_max_frame_len(mut self, max_len: usize) -> Self {
        self.max_frame_len = max_len;
        self
    }

    /// Get the service statistics.
    pub fn stats(&self) -> &Arc<ServiceStats> {
        &self.stats
    }

    /// Classify one frame and run its handler.
    ///
    /// This is the pure dispatch path; the response length is 32, 32, or 64
    /// bytes depending only on the command kind.
    pub fn handle_frame(&self, frame: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let response = match classify(frame, self.unknown_command)? {
            Command::PublicKey => {
                debug!("serving public key request");
                handlers::public_key(&self.keypair).to_vec()
            }
            Command::KeyAgreement { scalar } => {
                debug!("serving key agreement request");
                handlers::key_agreement(&self.keypair, &scalar, self.key_agreement).to_vec()
            }
            Command::Sign { message } => {
                debug!(len = message.len(), "serving sign request");
                handlers::sign(&self.keypair, message).to_vec()
            }
        };
        Ok(response)
    }

    /// Serve requests on `transport` until it disconnects.
    ///
    /// Idle timeouts and rejected requests keep the loop running; so do
    /// response write failures. Only a broken transport ends the loop.
    pub async fn run(&self, transport: &dyn ByteTransport) -> Result<(), CoreError> {
        loop {
            let frame = match transport.recv(self.max_frame_len, self.read_timeout).await {
                Ok(Some(frame)) if !frame.is_empty() => frame,
                // Zero-length reads and timeouts are idle cycles.
                Ok(_) => {
                    self.stats.inc_idle_timeouts();
                    continue;
                }
                Err(TransportError::Disconnected) => {
                    info!("transport disconnected, ending service loop");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            self.stats.inc_received();

            let response = match self.handle_frame(&frame) {
                Ok(response) => response,
                Err(e) => {
                    warn!("dropping request: {e}");
                    self.stats.inc_rejected();
                    continue;
                }
            };

            match transport.send(&response).await {
                Ok(()) => self.stats.inc_answered(),
                Err(e) => {
                    // The service must keep serving subsequent requests.
                    warn!("response write failed: {e}");
                    self.stats.inc_write_failures();
                }
            }
        }
    }
}
