//! Serves a `demo` service on http://127.0.0.1:3000/api
//!
//! ```text
//! curl -s -XPOST localhost:3000/api \
//!   -d '{"jsonrpc":"2.0","method":"demo.Test","params":{"ID":"abc"},"id":1}'
//! ```

use jrpc_server::{
    AxumRpcLayer, Empty, Error, MethodSet, RequestContext, SecurityConfig, Server, Service,
    rpc_error,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Default, Deserialize)]
struct TestArgs {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Default, Serialize)]
struct TestReply {
    #[serde(rename = "LogID")]
    log_id: String,
}

#[derive(Default, Serialize)]
struct PeerReply {
    addr: Option<String>,
    user_agent: Option<String>,
    correlation_id: String,
}

struct DemoApi;

impl DemoApi {
    fn test(&self, _: &RequestContext, args: &TestArgs, out: &mut TestReply) -> Result<(), Error> {
        if args.id.is_empty() {
            return Err(rpc_error!(-32602, "ID is required"));
        }
        out.log_id = args.id.clone();
        Ok(())
    }

    fn peer(&self, ctx: &RequestContext, _: &Empty, reply: &mut PeerReply) -> Result<(), Error> {
        reply.addr = ctx.remote_addr.map(|addr| addr.to_string());
        reply.user_agent = ctx.header("user-agent").map(str::to_string);
        reply.correlation_id = ctx.correlation_id.to_string();
        Ok(())
    }
}

impl Service for DemoApi {
    fn methods(&self) -> MethodSet<Self> {
        MethodSet::new()
            .method("Test", Self::test)
            .method("Peer", Self::peer)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let server = Server::new();
    server.register_service(DemoApi, "demo")?;

    let layer = AxumRpcLayer::builder()
        .server(server)
        .path("/api")
        .security(SecurityConfig::new().max_request_size(64 * 1024))
        .build()?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    layer.serve(listener).await?;
    Ok(())
}
