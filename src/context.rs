//! Per-request context handed to every service method.
//!
//! The transport fills in what it knows about the inbound request. Methods can
//! read the remote address, the HTTP method and headers, and stash or read
//! typed metadata (an authenticated user, a tenant, a database handle).

use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Type alias for request metadata storage
type Metadata = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Request context
#[derive(Clone)]
pub struct RequestContext {
    /// Remote address of the client, when the transport knows it
    pub remote_addr: Option<SocketAddr>,

    /// HTTP method the request arrived with
    pub http_method: String,

    /// Request headers, names lowercased, values lossily decoded as UTF-8
    pub headers: HashMap<String, String>,

    /// Generated per request and attached to every log event of the dispatch
    pub correlation_id: uuid::Uuid,

    /// User-defined metadata
    pub metadata: Metadata,
}

impl RequestContext {
    /// Create a context for a `POST` request with a fresh correlation id
    pub fn new() -> Self {
        Self {
            remote_addr: None,
            http_method: "POST".to_string(),
            headers: HashMap::new(),
            correlation_id: uuid::Uuid::new_v4(),
            metadata: HashMap::new(),
        }
    }

    /// Create context with remote address
    pub fn with_addr(remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr: Some(remote_addr),
            ..Self::new()
        }
    }

    /// Set a header, lowercasing its name
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Insert typed metadata
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.metadata.insert(key.into(), Arc::new(value));
    }

    /// Get typed metadata
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.metadata.get(key).and_then(|v| v.downcast_ref::<T>())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("remote_addr", &self.remote_addr)
            .field("http_method", &self.http_method)
            .field("headers", &self.headers)
            .field("correlation_id", &self.correlation_id)
            .field("metadata_keys", &self.metadata.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = RequestContext::default();
        assert!(ctx.remote_addr.is_none());
        assert_eq!(ctx.http_method, "POST");
        assert!(ctx.headers.is_empty());
        assert!(ctx.metadata.is_empty());
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let ctx = RequestContext::with_addr(addr);
        assert_eq!(ctx.remote_addr, Some(addr));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let ctx = RequestContext::new().with_header("X-Request-Id", "r-1");
        assert_eq!(ctx.header("x-request-id"), Some("r-1"));
        assert_eq!(ctx.header("X-REQUEST-ID"), Some("r-1"));
        assert_eq!(ctx.header("missing"), None);
    }

    #[test]
    fn test_typed_metadata() {
        let mut ctx = RequestContext::new();
        ctx.insert("user_id", 42u64);
        assert_eq!(ctx.get::<u64>("user_id"), Some(&42));
        assert_eq!(ctx.get::<String>("user_id"), None);
        assert_eq!(ctx.get::<u64>("other"), None);
    }
}
