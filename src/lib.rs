//! Activation & session arbitration service.
//!
//! This crate issues per-installation activation keys and enforces that at
//! most one physical device holds an active session against a given key at
//! any time. It ships both sides of the protocol:
//!
//! - the **server** (the `activation-service` binary): an Axum HTTP service
//!   in front of a PostgreSQL-backed record store, arbitrating session
//!   acquisition, heartbeat renewal, release, and key administration;
//! - the **client** (the [`client`] module): the activation client, the
//!   background heartbeat task, and the device fingerprint derivation,
//!   linked into the protected application process.
//!
//! # Arbitration rules
//!
//! - A key with no session, or a stale session, may be acquired by any
//!   device.
//! - A live session is only ever displaced by the same device fingerprint.
//! - A session goes stale when its last heartbeat is older than the
//!   configured timeout (default 10 minutes, twice the heartbeat period).
//! - Revoked keys reject everything, permanently.

pub mod app;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
