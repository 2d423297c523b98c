//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use chrono::Duration;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `ADMIN_TOKEN` (required): bearer credential for the admin endpoints
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `STALE_TIMEOUT_SECONDS` (optional): how long a session may go without
///   a heartbeat before any device can reclaim it; defaults to 600
/// - `HEARTBEAT_INTERVAL_SECONDS` (optional): renewal interval recommended
///   to clients; defaults to 300
///
/// The stale timeout defaults to twice the heartbeat interval so a session
/// survives one missed beat.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub admin_token: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_stale_timeout")]
    pub stale_timeout_seconds: u64,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default stale timeout: 10 minutes.
fn default_stale_timeout() -> u64 {
    600
}

/// Default heartbeat interval: 5 minutes.
fn default_heartbeat_interval() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// The stale timeout as a duration, for heartbeat-age comparisons.
    pub fn stale_timeout(&self) -> Duration {
        Duration::seconds(self.stale_timeout_seconds as i64)
    }
}
