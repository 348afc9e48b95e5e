//! Shared helpers for integration tests against a mock backend.

#![allow(dead_code)]

use std::sync::Arc;

use eventhorizon_session::{ClientConfig, MemoryTokenStore, Session};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri().parse().unwrap())
}

pub fn nova() -> Value {
    json!({ "id": 1, "username": "nova", "email": "nova@example.com" })
}

pub fn error_body(message: &str) -> Value {
    json!({ "error": message })
}

/// Accept `token` on `/api/auth/me`.
pub async fn mount_me(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": nova() })))
        .mount(server)
        .await;
}

/// A session restored from a persisted `token` the backend accepts.
pub async fn signed_in(server: &MockServer, token: &str) -> (Session, Arc<MemoryTokenStore>) {
    mount_me(server, token).await;
    let store = Arc::new(MemoryTokenStore::with_token(token));
    let session = Session::new(config(server), Arc::clone(&store));
    assert!(session.initialize().await.is_authenticated());
    (session, store)
}

/// Address of a backend that refuses connections.
pub fn unreachable_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
