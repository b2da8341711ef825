//! Key manager: owns the custodian's long-lived signing keypair.
//!
//! On startup the keypair is loaded from the key store, or generated and
//! persisted on first boot. After initialization it is immutable; handlers
//! receive it by reference and nothing mutates it for the process lifetime.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use zeroize::Zeroize;

use ekc_crypto::identity::{SigningIdentity, KEYPAIR_LEN, PUBLIC_KEY_LEN, SIGNATURE_LEN};

use crate::store::{KeyStore, StoreError};

/// Record name for the persisted public key (32 bytes).
pub const PUBLIC_KEY_RECORD: &str = "EKC_PK_KEY";

/// Record name for the persisted secret half (64-byte keypair encoding).
pub const SECRET_KEY_RECORD: &str = "EKC_SK_KEY";

/// Key manager errors. All of these are fatal at startup: the service
/// cannot run without usable key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key store error: {0}")]
    Store(#[from] StoreError),

    #[error("key store corrupt: {0}")]
    CorruptStore(String),

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

/// The custodian signing keypair, immutable after initialization.
pub struct Keypair {
    identity: SigningIdentity,
    public: [u8; PUBLIC_KEY_LEN],
}

impl Keypair {
    fn new(identity: SigningIdentity) -> Self {
        let public = identity.public();
        Self { identity, public }
    }

    /// The public half, the only key material ever sent in cleartext.
    pub fn public(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public
    }

    /// Produce a detached signature over `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.identity.sign(message)
    }

    /// The Ed25519 seed, for key-agreement scalar derivation only.
    pub(crate) fn seed(&self) -> [u8; 32] {
        self.identity.seed()
    }
}

/// Loads or creates the custodian keypair at startup.
pub struct KeyManager {
    keypair: Arc<Keypair>,
}

impl KeyManager {
    /// Initialize key material from the store.
    ///
    /// First boot (no public-key record) generates a fresh keypair and
    /// persists both halves. Later boots reload and validate the stored
    /// pair. A public record without a matching secret record is treated as
    /// storage corruption and refuses to start, rather than running with
    /// undefined key bytes.
    pub async fn initialize(store: &dyn KeyStore) -> Result<Self, KeyError> {
        let keypair = match store.get(PUBLIC_KEY_RECORD).await? {
            None => Self::generate_and_persist(store).await?,
            Some(pk_bytes) => Self::load_existing(store, pk_bytes).await?,
        };

        Ok(Self {
            keypair: Arc::new(keypair),
        })
    }

    async fn generate_and_persist(store: &dyn KeyStore) -> Result<Keypair, KeyError> {
        let identity = SigningIdentity::generate();

        let mut sk_bytes = identity.to_keypair_bytes().to_vec();
        store.put(PUBLIC_KEY_RECORD, &identity.public()).await?;
        store.put(SECRET_KEY_RECORD, &sk_bytes).await?;
        sk_bytes.zeroize();

        info!(
            public_key = %hex::encode(identity.public()),
            "generated and persisted new custodian keypair"
        );
        Ok(Keypair::new(identity))
    }

    async fn load_existing(store: &dyn KeyStore, pk_bytes: Vec<u8>) -> Result<Keypair, KeyError> {
        if pk_bytes.len() != PUBLIC_KEY_LEN {
            return Err(KeyError::CorruptStore(format!(
                "public key record has length {}, expected {}",
                pk_bytes.len(),
                PUBLIC_KEY_LEN
            )));
        }

        let mut sk_bytes = store.get(SECRET_KEY_RECORD).await?.ok_or_else(|| {
            KeyError::CorruptStore(
                "public key record present but secret key record missing".to_string(),
            )
        })?;

        if sk_bytes.len() != KEYPAIR_LEN {
            sk_bytes.zeroize();
            return Err(KeyError::CorruptStore(format!(
                "secret key record has length {}, expected {}",
                sk_bytes.len(),
                KEYPAIR_LEN
            )));
        }

        let mut sk_arr = [0u8; KEYPAIR_LEN];
        sk_arr.copy_from_slice(&sk_bytes);
        sk_bytes.zeroize();

        let identity = SigningIdentity::from_keypair_bytes(&sk_arr)
            .map_err(|e| KeyError::InvalidKeyMaterial(e.to_string()));
        sk_arr.zeroize();
        let identity = identity?;

        if identity.public().as_slice() != pk_bytes.as_slice() {
            return Err(KeyError::CorruptStore(
                "stored public key does not match secret key".to_string(),
            ));
        }

        info!(
            public_key = %hex::encode(identity.public()),
            "loaded existing custodian keypair"
        );
        Ok(Keypair::new(identity))
    }

    /// Shared handle to the initialized keypair.
    pub fn keypair(&self) -> Arc<Keypair> {
        self.keypair.clone()
    }

    /// The custodian public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        self.keypair.public()
    }
}
