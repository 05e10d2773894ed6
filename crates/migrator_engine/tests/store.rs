use std::time::Duration;

use migrator_engine::{ContentStore, IpfsRelayStore, LocalContentStore, StoreError};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn local_store_addresses_content_by_digest() {
    let temp = TempDir::new().unwrap();
    let store = LocalContentStore::new(temp.path().join("blobs"));

    let first = store
        .upload_file(b"hello".to_vec(), "a.txt", "text/plain")
        .await
        .unwrap();
    let second = store
        .upload_file(b"hello".to_vec(), "b.txt", "text/plain")
        .await
        .unwrap();

    assert_eq!(
        first,
        "sha256://2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(first, second);
    let blob = store.path_for(&first).expect("local pointer");
    assert_eq!(std::fs::read(blob).unwrap(), b"hello");
}

#[tokio::test]
async fn local_store_writes_json_documents() {
    let temp = TempDir::new().unwrap();
    let store = LocalContentStore::new(temp.path().to_path_buf());

    let pointer = store.upload_json(&json!({"content": "hi"})).await.unwrap();

    let text = std::fs::read_to_string(store.path_for(&pointer).unwrap()).unwrap();
    assert_eq!(text, r#"{"content":"hi"}"#);
    assert_eq!(store.path_for("ipfs://abc"), None);
}

#[tokio::test]
async fn relay_store_prefers_url_and_falls_back_to_cid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header_exists("content-type"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"cid": "bafyfile", "url": "ipfs://bafyfile"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cid": "bafydoc"})))
        .mount(&server)
        .await;

    let store = IpfsRelayStore::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();

    let file = store
        .upload_file(b"bytes".to_vec(), "a.jpg", "image/jpeg")
        .await
        .unwrap();
    let doc = store.upload_json(&json!({"content": "x"})).await.unwrap();

    assert_eq!(file, "ipfs://bafyfile");
    assert_eq!(doc, "ipfs://bafydoc");
}

#[tokio::test]
async fn relay_store_surfaces_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let store = IpfsRelayStore::new(server.uri(), Duration::from_secs(5)).unwrap();

    let err = store.upload_json(&json!({})).await.unwrap_err();
    assert!(matches!(err, StoreError::HttpStatus(502)));
}

#[tokio::test]
async fn relay_store_rejects_response_without_pointer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let store = IpfsRelayStore::new(server.uri(), Duration::from_secs(5)).unwrap();

    let err = store.upload_json(&json!({})).await.unwrap_err();
    assert!(matches!(err, StoreError::Response(_)));
}
