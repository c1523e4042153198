/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for stride-client tests

use chrono::{Duration, Utc};
use stride_client::{Session, SessionStore};
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Session holding `access_token` that expires `minutes` from now
/// (negative for an already-expired session).
pub fn test_session(access_token: &str, minutes: i64) -> Session {
    Session {
        access_token: access_token.to_string(),
        refresh_token: Some(format!("refresh-{access_token}")),
        user_id: "user-1".to_string(),
        expires_at: Utc::now() + Duration::minutes(minutes),
    }
}

/// Store pre-seeded with a signed-in session.
#[allow(dead_code)]
pub fn signed_in_store(access_token: &str) -> SessionStore {
    let store = SessionStore::new();
    store.set(test_session(access_token, 60));
    store
}

/// Token grant body the identity provider returns from /token.
#[allow(dead_code)]
pub fn grant_body(access_token: &str, expires_in: i64) -> serde_json::Value {
    serde_json::json!({
        "access_token": access_token,
        "refresh_token": format!("refresh-{access_token}"),
        "expires_in": expires_in,
        "user": { "id": "user-1", "email": "dev@example.com" },
    })
}
