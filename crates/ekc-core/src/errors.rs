//! Unified error type for EKC core operations.
//!
//! The taxonomy follows the service's failure semantics: store and key
//! errors are fatal at startup, transport errors end a connection, and
//! protocol errors drop a single request while the loop keeps serving.

use thiserror::Error;

pub use crate::keys::KeyError;
pub use crate::protocol::ProtocolError;
pub use crate::store::StoreError;
pub use ekc_transport::TransportError;

/// Unified error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Key manager error
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Protocol error
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport error
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
