//! HTTP transport tests against a mock vault server.
//!
//! The store is blocking, so each scenario runs on a blocking thread while
//! the mock server keeps serving on the runtime.

use std::time::Duration;

use lockbox::errors::LockboxError;
use lockbox::master::MasterKeyManager;
use lockbox::session::Session;
use lockbox::sync::{HttpRemoteStore, RemoteStore};
use lockbox::vault::{encrypt_payload, Payload, RecordKind, SecretRecord};
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSWORD: &[u8] = b"correct horse battery staple";

fn store(server: &MockServer) -> HttpRemoteStore {
    HttpRemoteStore::new(&server.uri(), Some("token".into()), Duration::from_secs(5))
}

/// A stored record with id 1 holding `ciphertext`.
fn stored(ciphertext: Vec<u8>) -> SecretRecord {
    let mut record = SecretRecord::new(RecordKind::Text, "Note", "work", ciphertext).unwrap();
    record.id = 1;
    record.owner_id = 7;
    record
}

/// The list endpoint's shape: no `encrypted_data`, a null `content`.
fn listing(record: &SecretRecord) -> Value {
    let mut entry = serde_json::to_value(record).unwrap();
    let fields = entry.as_object_mut().unwrap();
    fields.remove("encrypted_data");
    fields.remove("user_id");
    fields.insert("content".into(), Value::Null);
    Value::Array(vec![entry])
}

async fn mount_list(server: &MockServer, record: &SecretRecord) {
    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .and(header("Authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(record)))
        .mount(server)
        .await;
}

async fn mount_encrypted(server: &MockServer, record: &SecretRecord) {
    Mock::given(method("GET"))
        .and(path("/api/data/1/encrypted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn listing_is_completed_from_encrypted_endpoint() {
    let server = MockServer::start().await;
    let full = stored(vec![7; 48]);
    mount_list(&server, &full).await;
    mount_encrypted(&server, &full).await;

    let mut store = store(&server);
    let records = tokio::task::spawn_blocking(move || store.get_all(7))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].ciphertext, vec![7; 48]);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_completion_keeps_listing_entry() {
    let server = MockServer::start().await;
    let full = stored(vec![7; 48]);
    mount_list(&server, &full).await;
    Mock::given(method("GET"))
        .and(path("/api/data/1/encrypted"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut store = store(&server);
    let records = tokio::task::spawn_blocking(move || store.get_all(7))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Note");
    assert!(records[0].ciphertext.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn synced_record_from_listing_can_be_revealed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let manager = MasterKeyManager::new(dir.path(), "alice").unwrap();
    manager.set_master_password(PASSWORD).unwrap();
    let key = manager.derive_session_key(PASSWORD).unwrap();
    let body = Payload::Text {
        body: "from another device".into(),
    };
    let full = stored(encrypt_payload(&body, key.as_bytes()).unwrap());
    mount_list(&server, &full).await;
    mount_encrypted(&server, &full).await;

    let store = store(&server);
    let revealed = tokio::task::spawn_blocking(move || {
        let mut session = Session::open(manager, store, 7);
        session.unlock(PASSWORD)?;
        session.sync()?;
        assert!(!session.record(1i64)?.ciphertext.is_empty());
        session.reveal(1i64)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(revealed, body);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_ciphertext_is_fetched_on_reveal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let manager = MasterKeyManager::new(dir.path(), "alice").unwrap();
    manager.set_master_password(PASSWORD).unwrap();
    let key = manager.derive_session_key(PASSWORD).unwrap();
    let body = Payload::Text {
        body: "late ciphertext".into(),
    };
    let full = stored(encrypt_payload(&body, key.as_bytes()).unwrap());
    mount_list(&server, &full).await;
    // Unavailable during the sync, served afterwards.
    Mock::given(method("GET"))
        .and(path("/api/data/1/encrypted"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_encrypted(&server, &full).await;

    let store = store(&server);
    let revealed = tokio::task::spawn_blocking(move || {
        let mut session = Session::open(manager, store, 7);
        session.unlock(PASSWORD)?;
        session.sync()?;
        assert!(session.record(1i64)?.ciphertext.is_empty());
        session.reveal(1i64)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(revealed, body);
}

#[tokio::test(flavor = "multi_thread")]
async fn status_codes_surface_as_store_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/data/9"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let mut store = store(&server);
    let (list, delete) =
        tokio::task::spawn_blocking(move || (store.get_all(7), store.delete(9)))
            .await
            .unwrap();

    assert!(matches!(list, Err(LockboxError::Unauthorized)));
    assert!(matches!(delete, Err(LockboxError::AccessDenied(9))));
}
