//! X25519 key agreement over the custodian's long-lived signing seed.

use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

use crate::hash::sha512;

/// Shared-secret length in bytes.
pub const SHARED_SECRET_LEN: usize = 32;

/// Derive the key-exchange scalar from an Ed25519 seed.
///
/// First 32 bytes of SHA-512 over the seed, the standard Ed25519-to-X25519
/// secret conversion. Clamping happens inside [`shared_secret`].
pub fn exchange_scalar(seed: &[u8; 32]) -> [u8; 32] {
    let digest = sha512(seed);
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[..32]);
    scalar
}

/// Clamped X25519 scalar multiplication of `scalar` with the peer's point.
pub fn shared_secret(scalar: [u8; 32], peer_point: [u8; 32]) -> [u8; SHARED_SECRET_LEN] {
    x25519(scalar, peer_point)
}

/// Public point for a scalar: clamped multiplication with the basepoint.
pub fn public_point(scalar: [u8; 32]) -> [u8; 32] {
    x25519(scalar, X25519_BASEPOINT_BYTES)
}
