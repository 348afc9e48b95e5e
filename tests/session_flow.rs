//! Session lifecycle against a mock backend.

mod support;

use std::sync::Arc;
use std::time::Duration;

use eventhorizon_session::{
    ClientConfig, Error, IdentityAssertion, MemoryTokenStore, Session, SessionState,
    SessionToken, TokenStore, User,
};
use serde_json::json;
use support::{config, error_body, mount_me, nova, unreachable_uri};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn fresh_start_without_token_makes_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let session = Session::new(config(&server), MemoryTokenStore::new());
    let state = session.initialize().await;

    assert!(!state.is_loading());
    assert!(!state.is_authenticated());
    assert!(state.user().is_none());
}

#[tokio::test]
async fn stored_token_accepted_restores_session() {
    let server = MockServer::start().await;
    mount_me(&server, "abc").await;

    let store = Arc::new(MemoryTokenStore::with_token("abc"));
    let session = Session::new(config(&server), Arc::clone(&store));
    let state = session.initialize().await;

    let expected_user = User::new(1_i64)
        .with_username("nova")
        .with_email("nova@example.com");
    assert_eq!(
        state,
        SessionState::Authenticated {
            token: SessionToken::new("abc"),
            user: expected_user.clone(),
        }
    );
    assert_eq!(session.user(), Some(expected_user));
    assert_eq!(session.token(), Some(SessionToken::new("abc")));
    assert_eq!(store.load().unwrap(), Some(SessionToken::new("abc")));
}

#[tokio::test]
async fn stored_token_rejected_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("Invalid token")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("stale"));
    let session = Session::new(config(&server), Arc::clone(&store));
    let state = session.initialize().await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn unreachable_backend_degrades_to_unauthenticated() {
    let store = Arc::new(MemoryTokenStore::with_token("abc"));
    let config = ClientConfig::new(unreachable_uri().parse().unwrap());
    let session = Session::new(config, Arc::clone(&store));

    let state = session.initialize().await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn malformed_me_response_degrades_to_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::with_token("abc"));
    let session = Session::new(config(&server), Arc::clone(&store));

    assert_eq!(session.initialize().await, SessionState::Unauthenticated);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn login_success_persists_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "a@b.com", "password": "hunter22" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": "t-1", "user": nova() })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let session = Session::new(config(&server), Arc::clone(&store));
    session.initialize().await;

    let payload = session.login("a@b.com", "hunter22").await.unwrap();

    assert_eq!(payload.token, SessionToken::new("t-1"));
    assert_eq!(payload.user.username.as_deref(), Some("nova"));
    assert!(session.is_authenticated());
    assert_eq!(store.load().unwrap(), Some(SessionToken::new("t-1")));
}

#[tokio::test]
async fn login_rejected_surfaces_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("Invalid credentials")))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let session = Session::new(config(&server), Arc::clone(&store));
    session.initialize().await;

    let err = session.login("a@b.com", "wrong").await.unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(matches!(err, Error::Authentication { status: 401, .. }));
    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn login_rejected_keeps_existing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("Invalid credentials")))
        .mount(&server)
        .await;
    let (session, store) = support::signed_in(&server, "abc").await;
    let before = session.state();

    session.login("other@b.com", "wrong").await.unwrap_err();

    assert_eq!(session.state(), before);
    assert_eq!(store.load().unwrap(), Some(SessionToken::new("abc")));
}

#[tokio::test]
async fn login_rejected_without_error_body_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let session = Session::new(config(&server), MemoryTokenStore::new());
    let err = session.login("a@b.com", "pw").await.unwrap_err();

    assert_eq!(err.to_string(), "Login failed");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn register_success_and_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(
            json!({ "email": "n@x.io", "username": "nova", "password": "hunter22" }),
        ))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "token": "t-reg", "user": nova() })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(409).set_body_json(error_body("Email already in use")))
        .mount(&server)
        .await;

    let session = Session::new(config(&server), MemoryTokenStore::new());

    let err = session.register("taken@x.io", "nova2", "hunter22").await.unwrap_err();
    assert_eq!(err.to_string(), "Email already in use");
    assert!(!session.is_authenticated());

    let payload = session.register("n@x.io", "nova", "hunter22").await.unwrap();
    assert_eq!(payload.token, SessionToken::new("t-reg"));
    assert_eq!(session.token(), Some(SessionToken::new("t-reg")));
}

#[tokio::test]
async fn external_identity_exchanges_assertion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/google"))
        .and(body_json(json!({ "credential": "signed.jwt.value" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": "t-ext", "user": nova() })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/google"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({})))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let session = Session::new(config(&server), Arc::clone(&store));

    let err = session
        .login_with_external_identity(IdentityAssertion::new("forged"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Google sign-in failed");

    session
        .login_with_external_identity(IdentityAssertion::new("signed.jwt.value"))
        .await
        .unwrap();
    assert!(session.is_authenticated());
    assert_eq!(store.load().unwrap(), Some(SessionToken::new("t-ext")));
}

#[tokio::test]
async fn login_transport_failure_propagates() {
    let config = ClientConfig::new(unreachable_uri().parse().unwrap());
    let session = Session::new(config, MemoryTokenStore::new());

    let err = session.login("a@b.com", "pw").await.unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err:?}");
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn login_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "token": "late", "user": nova() }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let session = Session::new(
        config(&server).with_timeout(Duration::from_millis(50)),
        MemoryTokenStore::new(),
    );

    let err = session.login("a@b.com", "pw").await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn concurrent_logins_last_response_wins() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "slow@b.com", "password": "pw" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "token": "slow", "user": nova() }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "fast@b.com", "password": "pw" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": "fast", "user": nova() })),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let session = Session::new(config(&server), Arc::clone(&store));

    let (slow, fast) = tokio::join!(
        session.login("slow@b.com", "pw"),
        session.login("fast@b.com", "pw"),
    );
    assert_eq!(slow.unwrap().token, SessionToken::new("slow"));
    assert_eq!(fast.unwrap().token, SessionToken::new("fast"));

    assert_eq!(session.token(), Some(SessionToken::new("slow")));
    assert_eq!(store.load().unwrap(), Some(SessionToken::new("slow")));
}

#[tokio::test]
async fn logout_clears_everything() {
    let server = MockServer::start().await;
    let (session, store) = support::signed_in(&server, "abc").await;
    let mut rx = session.subscribe();

    session.logout();

    assert_eq!(session.state(), SessionState::Unauthenticated);
    assert_eq!(store.load().unwrap(), None);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), SessionState::Unauthenticated);
}
