//! Activation Service - Main Application Entry Point
//!
//! This is a REST API server arbitrating activation sessions: it decides which physical device holds a given activation key, keeps sessions alive via heartbeats, and exposes key administration to operators.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Record Store**: PostgreSQL with sqlx behind the RecordStore trait
//! - **Admin Authentication**: bearer credential with SHA-256 digest comparison
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Wrap the pool in the retrying record store
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use activation_service::{
    app::{self, AppState},
    config::Config,
    db,
    store::{PgRecordStore, RetryingStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Store unavailability is retried with backoff before surfacing
    let store = Arc::new(RetryingStore::new(PgRecordStore::new(pool)));

    let state = AppState::new(store, Arc::new(config.clone()));
    let app = app::router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
