/*
[INPUT]:  Mock backend responses including 401 error codes
[OUTPUT]: Test results for the gateway's auth retry contract
[POS]:    Integration tests - HTTP gateway
[UPDATE]: When the 401 retry contract or error parsing changes
*/

mod common;

use async_trait::async_trait;
use common::{setup_mock_server, signed_in_store, test_session};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use stride_client::{ApiGateway, QueueJobStatus, Result, SessionHooks, SessionStore, StrideError};
use tokio_test::assert_ok;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

/// Counting session hooks: refresh installs `new_token` into the store
/// and reports how often each hook fired.
struct CountingHooks {
    store: SessionStore,
    new_token: String,
    refresh_calls: AtomicUsize,
    unauthorized_calls: AtomicUsize,
    refresh_fails: bool,
}

impl CountingHooks {
    fn new(store: SessionStore, new_token: &str) -> Arc<Self> {
        Arc::new(Self {
            store,
            new_token: new_token.to_string(),
            refresh_calls: AtomicUsize::new(0),
            unauthorized_calls: AtomicUsize::new(0),
            refresh_fails: false,
        })
    }

    fn failing(store: SessionStore) -> Arc<Self> {
        Arc::new(Self {
            store,
            new_token: String::new(),
            refresh_calls: AtomicUsize::new(0),
            unauthorized_calls: AtomicUsize::new(0),
            refresh_fails: true,
        })
    }
}

#[async_trait]
impl SessionHooks for CountingHooks {
    async fn refresh_access_token(&self) -> Result<String> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails {
            return Err(StrideError::SessionExpired);
        }
        self.store.set(test_session(&self.new_token, 60));
        Ok(self.new_token.clone())
    }

    async fn handle_unauthorized(&self) {
        self.unauthorized_calls.fetch_add(1, Ordering::SeqCst);
        self.store.clear();
    }
}

fn unauthorized_body(code: &str) -> serde_json::Value {
    serde_json::json!({ "error_code": code, "message": "unauthorized" })
}

#[tokio::test]
async fn test_anonymous_requests_carry_api_key_as_bearer() {
    let server = setup_mock_server().await;
    let gateway = assert_ok!(ApiGateway::new(
        &server.uri(),
        "anon-key",
        SessionStore::new()
    ));

    Mock::given(method("GET"))
        .and(path("/get-queue-status/q-1"))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "queue_id": "q-1",
            "status": "processing",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let job = assert_ok!(gateway.get_queue_status("q-1").await);
    assert_eq!(job.queue_id, "q-1");
    assert_eq!(job.status, QueueJobStatus::Processing);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn test_base_url_path_prefix_is_preserved() {
    let server = setup_mock_server().await;
    let base = format!("{}/api/v1", server.uri());
    let gateway = assert_ok!(ApiGateway::new(&base, "anon-key", SessionStore::new()));

    Mock::given(method("GET"))
        .and(path("/api/v1/get-queue-status/q-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "queue_id": "q-1",
            "status": "pending",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let job = assert_ok!(gateway.get_queue_status("q-1").await);
    assert_eq!(job.status, QueueJobStatus::Pending);
}

#[tokio::test]
async fn test_plain_text_error_body_is_surfaced() {
    let server = setup_mock_server().await;
    let gateway = assert_ok!(ApiGateway::new(
        &server.uri(),
        "anon-key",
        SessionStore::new()
    ));

    Mock::given(method("GET"))
        .and(path("/get-queue-status/q-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = gateway.get_queue_status("q-1").await.unwrap_err();
    match err {
        StrideError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_token_expired_refreshes_and_retries_once() {
    let server = setup_mock_server().await;
    let store = signed_in_store("stale-token");
    let gateway = assert_ok!(ApiGateway::new(&server.uri(), "anon-key", store.clone()));
    let hooks = CountingHooks::new(store, "fresh-token");
    gateway.set_session_hooks(hooks.clone());

    Mock::given(method("GET"))
        .and(path("/get-queue-status/q-1"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(unauthorized_body("TOKEN_EXPIRED")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get-queue-status/q-1"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "queue_id": "q-1",
            "status": "complete",
            "result": { "task_id": "t-1" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let job = assert_ok!(gateway.get_queue_status("q-1").await);

    assert_eq!(job.status, QueueJobStatus::Complete);
    assert_eq!(hooks.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.unauthorized_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_second_401_after_retry_fires_unauthorized_once() {
    let server = setup_mock_server().await;
    let store = signed_in_store("stale-token");
    let gateway = assert_ok!(ApiGateway::new(&server.uri(), "anon-key", store.clone()));
    let hooks = CountingHooks::new(store, "fresh-token");
    gateway.set_session_hooks(hooks.clone());

    // Every attempt 401s with the retryable code; only one refresh and
    // one unauthorized callback are allowed regardless.
    Mock::given(method("GET"))
        .and(path("/get-queue-status/q-1"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(unauthorized_body("TOKEN_EXPIRED")),
        )
        .expect(2)
        .mount(&server)
        .await;

    let err = gateway.get_queue_status("q-1").await.unwrap_err();

    assert!(matches!(err, StrideError::SessionExpired));
    assert_eq!(hooks.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.unauthorized_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_token_invalid_is_terminal_without_refresh() {
    let server = setup_mock_server().await;
    let store = signed_in_store("stale-token");
    let gateway = assert_ok!(ApiGateway::new(&server.uri(), "anon-key", store.clone()));
    let hooks = CountingHooks::new(store, "fresh-token");
    gateway.set_session_hooks(hooks.clone());

    Mock::given(method("GET"))
        .and(path("/get-queue-status/q-1"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(unauthorized_body("TOKEN_INVALID")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway.get_queue_status("q-1").await.unwrap_err();

    assert!(matches!(err, StrideError::SessionExpired));
    assert_eq!(hooks.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(hooks.unauthorized_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_refresh_signs_out_without_retry() {
    let server = setup_mock_server().await;
    let store = signed_in_store("stale-token");
    let gateway = assert_ok!(ApiGateway::new(&server.uri(), "anon-key", store.clone()));
    let hooks = CountingHooks::failing(store.clone());
    gateway.set_session_hooks(hooks.clone());

    Mock::given(method("GET"))
        .and(path("/get-queue-status/q-1"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(unauthorized_body("TOKEN_EXPIRED")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway.get_queue_status("q-1").await.unwrap_err();

    assert!(matches!(err, StrideError::SessionExpired));
    assert_eq!(hooks.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.unauthorized_calls.load(Ordering::SeqCst), 1);
    assert!(!store.is_signed_in());
}
