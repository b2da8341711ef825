//! Signing identity for the custodian keypair.
//!
//! Wraps the Ed25519 primitives behind the fixed-size byte interfaces the
//! rest of the service works with. Key material is zeroized on drop.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of the persisted secret half: 32-byte seed followed by the
/// 32-byte public key, the classic `crypto_sign` secret-key layout.
pub const KEYPAIR_LEN: usize = 64;

/// Detached signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Error type for identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("invalid keypair encoding: public half does not match seed")]
    InvalidKeypairEncoding,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid public key")]
    InvalidPublicKey,
}

/// A long-lived Ed25519 signing identity.
///
/// Holds the private key material and produces detached signatures. The
/// secret half never leaves this type except through
/// [`to_keypair_bytes`](Self::to_keypair_bytes) for persistence.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningIdentity {
    /// Ed25519 signing private key
    #[zeroize(skip)] // SigningKey implements Zeroize internally
    sign_key: SigningKey,
}

impl SigningIdentity {
    /// Generate a fresh identity from the OS random source.
    pub fn generate() -> Self {
        let sign_key = SigningKey::generate(&mut OsRng);
        Self { sign_key }
    }

    /// Restore an identity from its 64-byte keypair encoding.
    ///
    /// Fails if the embedded public half does not match the one derived
    /// from the seed, which catches corrupted or truncated key records.
    pub fn from_keypair_bytes(bytes: &[u8; KEYPAIR_LEN]) -> Result<Self, IdentityError> {
        let sign_key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|_| IdentityError::InvalidKeypairEncoding)?;
        Ok(Self { sign_key })
    }

    /// The persisted form: seed followed by public key, 64 bytes.
    pub fn to_keypair_bytes(&self) -> [u8; KEYPAIR_LEN] {
        self.sign_key.to_keypair_bytes()
    }

    /// The 32-byte seed, used to derive the key-exchange scalar.
    pub fn seed(&self) -> [u8; 32] {
        self.sign_key.to_bytes()
    }

    /// Get the Ed25519 public key bytes.
    pub fn public(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.sign_key.verifying_key().to_bytes()
    }

    /// Sign a message, producing a 64-byte detached signature.
    ///
    /// Ed25519 signing is deterministic: the same key and message always
    /// produce the same signature.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        let signature: Signature = self.sign_key.sign(message);
        signature.to_bytes()
    }
}

/// Verify a detached Ed25519 signature.
///
/// # Arguments
/// * `pub_key` - The signer's Ed25519 public key (32 bytes)
/// * `message` - The message that was signed
/// * `signature` - The 64-byte detached signature
pub fn verify_signature(
    pub_key: &[u8; PUBLIC_KEY_LEN],
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<(), IdentityError> {
    let verifying_key =
        VerifyingKey::from_bytes(pub_key).map_err(|_| IdentityError::InvalidPublicKey)?;
    let sig = Signature::from_bytes(signature);
    verifying_key
        .verify_strict(message, &sig)
        .map_err(|_| IdentityError::InvalidSignature)
}
