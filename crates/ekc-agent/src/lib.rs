//! EKC Agent - daemon binary for the embedded key custodian.
//!
//! Wires the key store, key manager, and service loop to a TCP byte-stream
//! listener and keeps serving until shutdown.

pub mod config;
