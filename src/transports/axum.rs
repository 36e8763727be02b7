//! Axum HTTP transport for the JSON-RPC server.
//!
//! One `POST` carries one request envelope. Any other HTTP method is answered
//! with 405 and a minimal error envelope without reaching the dispatcher.
//! The status of dispatched requests comes from the dispatcher: 200 on
//! success, 400 on any JSON-RPC error.

use crate::context::RequestContext;
use crate::middleware::JsonHeadersLayer;
use crate::server::{Reply, Server};
use crate::traits::BodyProcessor;
use crate::transports::security::SecurityConfig;
use crate::types::{Error, Response as RpcResponse};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Router, body};
use http_body_util::LengthLimitError;
use std::net::SocketAddr;
use std::sync::Arc;

/// Path the RPC endpoint is mounted on unless configured otherwise
pub const DEFAULT_PATH: &str = "/api";

/// Errors from building or running the HTTP transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("processor not set")]
    MissingProcessor,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
struct RpcState {
    processor: Arc<dyn BodyProcessor>,
    security: SecurityConfig,
}

pub struct AxumRpcBuilder {
    processor: Option<Arc<dyn BodyProcessor>>,
    path: String,
    security: SecurityConfig,
}

impl AxumRpcBuilder {
    pub fn new() -> Self {
        Self {
            processor: None,
            path: DEFAULT_PATH.to_string(),
            security: SecurityConfig::default(),
        }
    }

    /// Serve requests with a [`Server`]
    pub fn server(self, server: Server) -> Self {
        self.processor(server)
    }

    /// Serve requests with any body processor
    pub fn processor<P>(mut self, processor: P) -> Self
    where
        P: BodyProcessor + 'static,
    {
        self.processor = Some(Arc::new(processor));
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    pub fn build(self) -> Result<AxumRpcLayer, TransportError> {
        let processor = self.processor.ok_or(TransportError::MissingProcessor)?;

        Ok(AxumRpcLayer {
            processor,
            path: self.path,
            security: self.security,
        })
    }
}

impl Default for AxumRpcBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AxumRpcLayer {
    processor: Arc<dyn BodyProcessor>,
    path: String,
    security: SecurityConfig,
}

impl AxumRpcLayer {
    pub fn builder() -> AxumRpcBuilder {
        AxumRpcBuilder::new()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn into_router(self) -> Router {
        let state = RpcState {
            processor: self.processor,
            security: self.security,
        };
        Router::new()
            .route(&self.path, any(handle_rpc))
            .with_state(state)
            .layer(JsonHeadersLayer::new())
    }

    /// Serve on a bound listener until the connection loop fails
    pub async fn serve(self, listener: tokio::net::TcpListener) -> Result<(), TransportError> {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, path = %self.path, "json-rpc server listening");
        let router = self.into_router();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

/// Router serving `server` on `path` with default limits
pub fn create_rpc_router(server: Server, path: &str) -> Router {
    AxumRpcLayer {
        processor: Arc::new(server),
        path: path.to_string(),
        security: SecurityConfig::default(),
    }
    .into_router()
}

async fn handle_rpc(State(state): State<RpcState>, request: Request) -> Response {
    let method = request.method().clone();
    if method != Method::POST {
        tracing::warn!(%method, "rejecting non-POST request");
        let error = Error::parse(format!("api: POST method required, received {method}"));
        return encoded(StatusCode::METHOD_NOT_ALLOWED, &RpcResponse::error(error, None));
    }

    let mut ctx = RequestContext::new();
    ctx.http_method = method.to_string();
    ctx.remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    for (name, value) in request.headers() {
        ctx.headers.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let limit = state.security.body_limit();
    let bytes = match body::to_bytes(request.into_body(), limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, limit, "failed to read request body");
            let response = RpcResponse::error(body_read_error(&err), None);
            return encoded(StatusCode::BAD_REQUEST, &response);
        }
    };

    let Reply { status, body } = state.processor.process(&bytes, ctx).await;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body).into_response()
}

fn body_read_error(err: &axum::Error) -> Error {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return Error::parse("request body too large");
        }
        source = cause.source();
    }
    Error::parse(format!("failed to read request body: {err}"))
}

fn encoded(status: StatusCode, response: &RpcResponse) -> Response {
    match serde_json::to_vec(response) {
        Ok(body) => (status, body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode transport error");
            status.into_response()
        }
    }
}
