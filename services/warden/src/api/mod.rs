//! Warden HTTP API.
//!
//! Role and API-token management plus health. Every route except health and
//! the OpenAPI document sits behind [`crate::auth::middleware::authorize`].
pub mod api_tokens;
pub mod error;
pub mod openapi;
pub mod roles;
pub mod system;
pub mod types;
