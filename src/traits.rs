//! Seam between transports and the dispatcher.

use crate::context::RequestContext;
use crate::server::{Reply, Server};
#[cfg(feature = "tokio")]
use crate::server::{Dispatched, status};
#[cfg(feature = "tokio")]
use crate::types::{Error, Response};

/// Turns one raw request body into one encoded reply.
///
/// Transports hold an `Arc<dyn BodyProcessor>` so they can be driven by a
/// [`Server`] or by a wrapper around one (rate limiting, auditing, tests).
#[async_trait::async_trait]
pub trait BodyProcessor: Send + Sync {
    /// Process a request body
    async fn process(&self, body: &[u8], ctx: RequestContext) -> Reply;

    /// Check if a dotted method name is served
    fn supports_method(&self, method: &str) -> bool {
        let _ = method;
        true
    }
}

#[async_trait::async_trait]
impl BodyProcessor for Server {
    async fn process(&self, body: &[u8], ctx: RequestContext) -> Reply {
        self.dispatch(body, &ctx)
    }

    fn supports_method(&self, method: &str) -> bool {
        self.has_method(method)
    }
}

/// A [`Server`] whose dispatch runs on tokio's blocking thread pool.
///
/// For services with methods that block on I/O or locks.
#[cfg(feature = "tokio")]
#[derive(Clone, Default)]
pub struct BlockingServer {
    server: Server,
}

#[cfg(feature = "tokio")]
impl BlockingServer {
    pub fn new(server: Server) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }
}

#[cfg(feature = "tokio")]
#[async_trait::async_trait]
impl BodyProcessor for BlockingServer {
    async fn process(&self, body: &[u8], ctx: RequestContext) -> Reply {
        let server = self.server.clone();
        let body = body.to_vec();
        match tokio::task::spawn_blocking(move || server.dispatch(&body, &ctx)).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(error = %err, "blocking dispatch did not complete");
                Dispatched {
                    status: status::BAD_REQUEST,
                    response: Response::error(Error::internal(err.to_string()), None),
                }
                .into_reply()
            }
        }
    }

    fn supports_method(&self, method: &str) -> bool {
        self.server.has_method(method)
    }
}
