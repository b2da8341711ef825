//! Request handlers: one function per command kind.
//!
//! Each handler produces a fixed-size response; the length depends only on
//! the command kind, never on the input content.

use ekc_crypto::identity::{PUBLIC_KEY_LEN, SIGNATURE_LEN};
use ekc_crypto::kex::{self, SHARED_SECRET_LEN};

use crate::keys::Keypair;
use crate::protocol::SCALAR_LEN;

/// How the key-agreement scalar is obtained from the signing key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyAgreementStrategy {
    /// Standard Ed25519-to-X25519 conversion: first 32 bytes of SHA-512
    /// over the seed, clamped by the X25519 multiplication.
    #[default]
    DerivedScalar,
    /// Legacy construction: the raw seed used directly as the scalar.
    /// Only for compatibility with hosts that expect the old derivation.
    RawSeed,
}

/// Return the public key verbatim. Pure, no failure mode.
pub fn public_key(keypair: &Keypair) -> [u8; PUBLIC_KEY_LEN] {
    *keypair.public()
}

/// Scalar-multiply the custodian's exchange scalar with the caller's value.
///
/// The caller's scalar is not validated: degenerate inputs (all-zero,
/// low-order points) still produce a deterministic output. Hosts needing
/// contributory behavior must check the result themselves.
pub fn key_agreement(
    keypair: &Keypair,
    scalar: &[u8; SCALAR_LEN],
    strategy: KeyAgreementStrategy,
) -> [u8; SHARED_SECRET_LEN] {
    let own_scalar = match strategy {
        KeyAgreementStrategy::DerivedScalar => kex::exchange_scalar(&keypair.seed()),
        KeyAgreementStrategy::RawSeed => keypair.seed(),
    };
    kex::shared_secret(own_scalar, *scalar)
}

/// Produce a detached signature over exactly the received bytes.
pub fn sign(keypair: &Keypair, message: &[u8]) -> [u8; SIGNATURE_LEN] {
    keypair.sign(message)
}
