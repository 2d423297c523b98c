//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};

use activation_service::app::{self, AppState};
use activation_service::config::Config;
use activation_service::store::{MemoryRecordStore, RecordStore};

/// Administrative credential used by every test server.
pub const ADMIN_TOKEN: &str = "test-operator-token";

/// Config with the production defaults (10 min staleness, 5 min heartbeat).
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused-in-tests".to_string(),
        admin_token: ADMIN_TOKEN.to_string(),
        server_port: 0,
        stale_timeout_seconds: 600,
        heartbeat_interval_seconds: 300,
    }
}

/// State over a fresh in-memory store.
pub fn test_state() -> AppState {
    test_state_with(test_config())
}

pub fn test_state_with(config: Config) -> AppState {
    AppState::new(Arc::new(MemoryRecordStore::new()), Arc::new(config))
}

/// Rewrites the held session so its last heartbeat lies `age` in the past.
///
/// Staleness is derived from the stored timestamp at read time, so tests
/// age a session by editing the record rather than waiting.
pub async fn age_session(state: &AppState, key: &str, age: Duration) {
    let versioned = state
        .store
        .get(key)
        .await
        .expect("store reachable")
        .expect("record exists");

    let mut record = versioned.record;
    let session = record
        .current_session
        .as_mut()
        .expect("a session is held");
    session.last_heartbeat_at = Utc::now() - age;

    state
        .store
        .put(&record, Some(versioned.version))
        .await
        .expect("aged session written");
}

/// Serves the production router on an ephemeral port.
///
/// Returns the base URL to point clients at.
pub async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app::router(state))
            .await
            .expect("server runs");
    });

    format!("http://{addr}")
}
