//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the arbitration or admin service
//! 3. Returns HTTP response (JSON, status code)

/// Key lifecycle administration endpoints
pub mod admin;
/// Health check endpoint
pub mod health;
/// Device-facing session endpoints
pub mod session;
