//! Key lifecycle administration, driven over the in-memory store.

mod common;

use chrono::{Duration, Utc};

use activation_service::error::AppError;
use activation_service::models::record::{KEY_PREFIX, KeyStatus};
use activation_service::services::{admin, arbitration};

use common::{age_session, test_state};

#[tokio::test]
async fn issued_key_roundtrips_through_get() {
    let state = test_state();

    let issued = admin::create_key(&state, Some("workstation 7".to_string()))
        .await
        .unwrap();
    assert!(issued.key.starts_with(KEY_PREFIX));

    let record = admin::get_key(&state, &issued.key).await.unwrap();
    assert_eq!(record.status, KeyStatus::Active);
    assert_eq!(record.label.as_deref(), Some("workstation 7"));
    assert_eq!(record.created_at, issued.created_at);
    assert!(record.current_session.is_none());
    assert!(record.created_at <= Utc::now());
}

#[tokio::test]
async fn get_unknown_key_is_not_found() {
    let state = test_state();

    let err = admin::get_key(&state, "act-missing").await.unwrap_err();
    assert!(matches!(err, AppError::KeyNotFound));
}

#[tokio::test]
async fn revoke_is_terminal_and_leaves_the_session_in_place() {
    let state = test_state();
    let key = admin::create_key(&state, None).await.unwrap().key;
    arbitration::acquire(&state, &key, "fp-a").await.unwrap();

    let revoked = admin::revoke_key(&state, &key).await.unwrap();
    assert_eq!(revoked.status, KeyStatus::Revoked);

    // The lingering session is harmless: the revoked status rejects all
    // acquisition and renewal regardless of session state.
    let record = admin::get_key(&state, &key).await.unwrap();
    assert_eq!(record.status, KeyStatus::Revoked);
    assert_eq!(
        record.current_session.unwrap().device_fingerprint,
        "fp-a"
    );
}

#[tokio::test]
async fn revoke_unknown_key_is_not_found() {
    let state = test_state();

    let err = admin::revoke_key(&state, "act-missing").await.unwrap_err();
    assert!(matches!(err, AppError::KeyNotFound));
}

#[tokio::test]
async fn revoking_twice_is_idempotent() {
    let state = test_state();
    let key = admin::create_key(&state, None).await.unwrap().key;

    admin::revoke_key(&state, &key).await.unwrap();
    let second = admin::revoke_key(&state, &key).await.unwrap();
    assert_eq!(second.status, KeyStatus::Revoked);
}

#[tokio::test]
async fn listing_projects_staleness_at_read_time() {
    let state = test_state();

    // Unheld key: no session, no staleness to report.
    let unheld = admin::create_key(&state, Some("unheld".to_string()))
        .await
        .unwrap()
        .key;

    // Freshly held key.
    let fresh = admin::create_key(&state, Some("fresh".to_string()))
        .await
        .unwrap()
        .key;
    arbitration::acquire(&state, &fresh, "fp-fresh").await.unwrap();

    // Held key whose device went quiet 11 minutes ago.
    let quiet = admin::create_key(&state, Some("quiet".to_string()))
        .await
        .unwrap()
        .key;
    arbitration::acquire(&state, &quiet, "fp-quiet").await.unwrap();
    age_session(&state, &quiet, Duration::minutes(11)).await;

    let listing = admin::list_keys(&state).await.unwrap();
    assert_eq!(listing.len(), 3);

    // Newest first.
    assert_eq!(listing[0].key, quiet);
    assert_eq!(listing[1].key, fresh);
    assert_eq!(listing[2].key, unheld);

    assert_eq!(listing[0].is_stale, Some(true));
    assert_eq!(listing[1].is_stale, Some(false));
    assert_eq!(listing[2].is_stale, None);
    assert!(listing[2].session.is_none());
    assert_eq!(
        listing[0].session.as_ref().unwrap().device_fingerprint,
        "fp-quiet"
    );
}
