//! End-to-end tests for the custodian boot and request/response flows.

use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use ekc_core::keys::{KeyManager, PUBLIC_KEY_RECORD, SECRET_KEY_RECORD};
use ekc_core::protocol::{KEY_AGREEMENT_TAG, PUBLIC_KEY_TAG, SCALAR_LEN};
use ekc_core::service::CustodianService;
use ekc_core::store::{FileKeyStore, KeyStore, MemoryKeyStore};
use ekc_transport::{ByteTransport, LoopbackTransport};

const HOST_TIMEOUT: Duration = Duration::from_secs(2);

/// Boot a custodian against `store` and wire it to a loopback host end.
async fn boot_service(
    store: &dyn KeyStore,
) -> (Arc<CustodianService>, LoopbackTransport, tokio::task::JoinHandle<()>) {
    let manager = KeyManager::initialize(store).await.unwrap();
    let service = Arc::new(
        CustodianService::new(manager.keypair()).with_read_timeout(Duration::from_millis(10)),
    );

    let (host_end, device_end) = LoopbackTransport::pair();
    let service2 = service.clone();
    let worker = tokio::spawn(async move {
        service2.run(&device_end).await.unwrap();
    });

    (service, host_end, worker)
}

#[tokio::test]
async fn fresh_boot_serves_generated_public_key() {
    let store = MemoryKeyStore::new();
    let (_service, host, worker) = boot_service(&store).await;

    host.send(PUBLIC_KEY_TAG).await.unwrap();
    let response = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();

    assert_eq!(response.len(), 32);
    let persisted = store.get(PUBLIC_KEY_RECORD).await.unwrap().unwrap();
    assert_eq!(response, persisted);

    host.close();
    worker.await.unwrap();
}

#[tokio::test]
async fn sign_request_verifies_against_served_public_key() {
    let store = MemoryKeyStore::new();

    // First boot generates; boot again to serve from persisted state.
    KeyManager::initialize(&store).await.unwrap();
    let (_service, host, worker) = boot_service(&store).await;

    host.send(PUBLIC_KEY_TAG).await.unwrap();
    let pk = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();

    host.send(b"hello").await.unwrap();
    let sig = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();
    assert_eq!(sig.len(), 64);

    let verifying_key = VerifyingKey::from_bytes(&pk.try_into().unwrap()).unwrap();
    let signature = Signature::from_bytes(&sig.try_into().unwrap());
    assert!(verifying_key.verify(b"hello", &signature).is_ok());

    host.close();
    worker.await.unwrap();
}

#[tokio::test]
async fn key_agreement_is_deterministic_and_input_sensitive() {
    let store = MemoryKeyStore::new();
    let (_service, host, worker) = boot_service(&store).await;

    let request = |scalar: [u8; SCALAR_LEN]| {
        let mut frame = KEY_AGREEMENT_TAG.to_vec();
        frame.extend_from_slice(&scalar);
        frame
    };

    host.send(&request([0x11; SCALAR_LEN])).await.unwrap();
    let shared1 = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();
    assert_eq!(shared1.len(), 32);

    host.send(&request([0x11; SCALAR_LEN])).await.unwrap();
    let shared2 = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();
    assert_eq!(shared1, shared2);

    host.send(&request([0x22; SCALAR_LEN])).await.unwrap();
    let shared3 = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();
    assert_ne!(shared1, shared3);

    host.close();
    worker.await.unwrap();

    // A different device key produces a different shared value.
    let other_store = MemoryKeyStore::new();
    let (_service, other_host, other_worker) = boot_service(&other_store).await;

    other_host.send(&request([0x11; SCALAR_LEN])).await.unwrap();
    let other_shared = other_host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();
    assert_ne!(shared1, other_shared);

    other_host.close();
    other_worker.await.unwrap();
}

#[tokio::test]
async fn boot_is_idempotent_across_restarts() {
    let dir = tempfile::TempDir::new().unwrap();

    let store1 = FileKeyStore::new(dir.path().to_path_buf());
    let boot1 = KeyManager::initialize(&store1).await.unwrap();
    let public1 = *boot1.public_key();
    drop(boot1);

    let store2 = FileKeyStore::new(dir.path().to_path_buf());
    let boot2 = KeyManager::initialize(&store2).await.unwrap();
    assert_eq!(*boot2.public_key(), public1);

    // Both halves survived byte-exact on disk.
    let sk1 = store1.get(SECRET_KEY_RECORD).await.unwrap().unwrap();
    let sk2 = store2.get(SECRET_KEY_RECORD).await.unwrap().unwrap();
    assert_eq!(sk1, sk2);
    assert_eq!(sk1.len(), 64);
}

#[tokio::test]
async fn response_length_is_a_function_of_command_kind() {
    let store = MemoryKeyStore::new();
    let (_service, host, worker) = boot_service(&store).await;

    host.send(&[0x61]).await.unwrap();
    let short_sig = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();

    host.send(&vec![0x61; 1000]).await.unwrap();
    let long_sig = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();

    assert_eq!(short_sig.len(), 64);
    assert_eq!(long_sig.len(), 64);
    assert_ne!(short_sig, long_sig);

    host.close();
    worker.await.unwrap();
}

#[tokio::test]
async fn classifier_priority_over_sign_fallback() {
    let store = MemoryKeyStore::new();
    let (_service, host, worker) = boot_service(&store).await;

    // Starts with the public-key tag: answered with 32 key bytes, never a
    // 64-byte signature.
    host.send(b"__public_key__ extra").await.unwrap();
    let response = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();
    assert_eq!(response.len(), 32);

    // Shorter than any tag: signed.
    host.send(b"__p").await.unwrap();
    let response = host.recv(1024, HOST_TIMEOUT).await.unwrap().unwrap();
    assert_eq!(response.len(), 64);

    host.close();
    worker.await.unwrap();
}
