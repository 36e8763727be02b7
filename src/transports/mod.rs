//! Transport layer for the JSON-RPC server.
//!
//! - **Axum**: HTTP transport serving one request per `POST`

pub mod security;

#[cfg(feature = "axum")]
pub mod axum;

pub use security::SecurityConfig;

#[cfg(feature = "axum")]
pub use self::axum::*;
