//! Shared application state and router construction.
//!
//! The router is built here rather than in `main` so integration tests can
//! mount the exact production route table over an in-memory store.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::handlers;
use crate::middleware;
use crate::store::RecordStore;

/// State shared by every handler.
///
/// The store is a trait object: handlers and services never know which
/// backend they are talking to.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }
}

/// Build the full application router.
///
/// # Route Groups
///
/// - Public: health check and the three device-facing session operations
///   (authenticated by the (key, fingerprint) pair itself)
/// - Admin: key lifecycle operations, gated by the administrative bearer
///   credential before any store access
pub fn router(state: AppState) -> Router {
    // Admin routes (operator credential required)
    let admin_routes = Router::new()
        .route("/api/v1/admin/keys", post(handlers::admin::create_key))
        .route("/api/v1/admin/keys", get(handlers::admin::list_keys))
        .route("/api/v1/admin/keys/{key}", get(handlers::admin::get_key))
        .route(
            "/api/v1/admin/keys/{key}/revoke",
            post(handlers::admin::revoke_key),
        )
        // Apply credential middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth,
        ));

    Router::new()
        // Public routes (no credential beyond the key/fingerprint pair)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/session/acquire", post(handlers::session::acquire))
        .route(
            "/api/v1/session/heartbeat",
            post(handlers::session::heartbeat),
        )
        .route("/api/v1/session/release", post(handlers::session::release))
        // Merge admin routes
        .merge(admin_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state)
}
