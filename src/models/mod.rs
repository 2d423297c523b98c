//! Data models: persisted activation records and API wire types.

/// Request/response bodies for the session and admin endpoints
pub mod api;
/// Activation record, session, and key status entities
pub mod record;
