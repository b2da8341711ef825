//! Transport abstraction for the custodian command stream.
//!
//! This crate provides the byte-channel trait the service loop runs over,
//! without OS- or bus-specific dependencies: a TCP binding for host-class
//! targets and in-memory transports for tests. A serial/UART driver would
//! implement the same trait.

pub mod traits;
pub mod tcp;
pub mod testing;

pub use traits::*;
pub use tcp::*;
pub use testing::*;
