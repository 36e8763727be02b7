//! # jrpc-server
//!
//! A JSON-RPC 2.0 server that dispatches one request envelope per HTTP `POST`
//! to methods of registered services.
//!
//! ## Features
//!
//! - **Service registry** - Services expose typed methods addressed as `Service.Method`
//! - **Byte-exact envelopes** - `params` and `id` are kept as raw JSON until used
//! - **Positional params** - A one-element array is accepted in place of the object
//! - **HTTP transport** - Axum router with a `POST` gate, body limit and JSON headers
//! - **Macro support** - Shorthand for building errors and requests
//!
//! ## Quick Start
//!
//! ```rust
//! use jrpc_server::*;
//!
//! #[derive(Default, serde::Deserialize)]
//! struct EchoArgs {
//!     text: String,
//! }
//!
//! struct Echo;
//!
//! impl Echo {
//!     fn say(&self, _: &RequestContext, args: &EchoArgs, out: &mut String) -> Result<(), Error> {
//!         *out = args.text.clone();
//!         Ok(())
//!     }
//! }
//!
//! impl Service for Echo {
//!     fn methods(&self) -> MethodSet<Self> {
//!         MethodSet::new().method("Say", Echo::say)
//!     }
//! }
//!
//! let server = Server::new();
//! server.register_service(Echo, "").unwrap();
//!
//! let reply = server.dispatch(
//!     br#"{"jsonrpc":"2.0","method":"Echo.Say","params":{"text":"hi"},"id":7}"#,
//!     &RequestContext::new(),
//! );
//! assert_eq!(reply.status, 200);
//! assert_eq!(reply.body, br#"{"jsonrpc":"2.0","result":"hi","id":7}"#.to_vec());
//! ```

pub mod builders;
pub mod context;
pub mod macros;
pub mod params;
pub mod registry;
pub mod server;
pub mod traits;
pub mod transports;
pub mod types;

#[cfg(feature = "axum")]
pub mod middleware;

// Re-export async_trait for users implementing BodyProcessor
pub use async_trait::async_trait;

pub use builders::*;
pub use context::RequestContext;
pub use params::{ParamDecodeError, decode_params};
pub use registry::*;
pub use server::*;
pub use traits::*;
pub use transports::SecurityConfig;
pub use types::*;

#[cfg(feature = "axum")]
pub use middleware::{JsonHeadersLayer, JSON_CONTENT_TYPE};
#[cfg(feature = "axum")]
pub use transports::axum::{AxumRpcBuilder, AxumRpcLayer, TransportError, create_rpc_router};
