//! Request dispatch.
//!
//! [`Server`] owns the service registry and turns one request body into one
//! response envelope plus the HTTP status the transport should use:
//!
//! | outcome                         | code    | status |
//! |---------------------------------|---------|--------|
//! | body is not a request           | -32700  | 400    |
//! | `jsonrpc` is not `"2.0"`        | -32600  | 400    |
//! | method does not resolve         | -32603  | 400    |
//! | params do not decode            | -32600  | 400    |
//! | method returned an error        | its own | 400    |
//! | success                         | -       | 200    |
//!
//! Unresolvable methods report the internal-error code rather than
//! method-not-found; existing clients match on it.

use crate::context::RequestContext;
use crate::registry::{InvokeError, Registry, RegistrationError, Service, ServiceDescriptor};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP status codes produced by dispatch
pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const METHOD_NOT_ALLOWED: u16 = 405;
}

// Used only if an envelope cannot be encoded, which serde_json values never trigger.
const ENCODE_FAILURE_BODY: &[u8] =
    br#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"response not encoded"},"id":null}"#;

/// A response envelope with the status it should be sent with
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub status: u16,
    pub response: Response,
}

impl Dispatched {
    fn ok(response: Response) -> Self {
        Self {
            status: status::OK,
            response,
        }
    }

    fn bad_request(error: Error, id: Option<RawJson>) -> Self {
        Self {
            status: status::BAD_REQUEST,
            response: Response::error(error, id),
        }
    }

    /// Serialize the envelope for the wire
    pub fn into_reply(self) -> Reply {
        match serde_json::to_vec(&self.response) {
            Ok(body) => Reply {
                status: self.status,
                body,
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to encode response envelope");
                Reply {
                    status: status::BAD_REQUEST,
                    body: ENCODE_FAILURE_BODY.to_vec(),
                }
            }
        }
    }
}

/// Encoded response body and status, ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// JSON-RPC server: service registration plus request dispatch.
///
/// Cloning is cheap and clones share the registry.
#[derive(Clone, Default)]
pub struct Server {
    registry: Arc<Registry>,
}

impl Server {
    /// Create a server with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a server over an existing registry
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Register a service; see [`Registry::register`]
    pub fn register_service<S: Service>(
        &self,
        handler: S,
        name: &str,
    ) -> Result<(), RegistrationError> {
        self.registry.register(handler, name)
    }

    /// Register a service whose handler is shared elsewhere
    pub fn register_service_arc<S: Service>(
        &self,
        handler: Arc<S>,
        name: &str,
    ) -> Result<(), RegistrationError> {
        self.registry.register_arc(handler, name)
    }

    /// Check whether a dotted `Service.Method` name resolves
    pub fn has_method(&self, method: &str) -> bool {
        self.registry.has_method(method)
    }

    /// Snapshot of the registered services
    pub fn list_services(&self) -> HashMap<String, Arc<ServiceDescriptor>> {
        self.registry.list_all()
    }

    /// Decode and validate a request envelope without dispatching it.
    ///
    /// The error side is the finished error response.
    pub fn prepare(&self, body: &[u8]) -> Result<Request, Box<Dispatched>> {
        let request = decode_envelope(body).map_err(Box::new)?;
        check_version(&request).map_err(Box::new)?;
        Ok(request)
    }

    /// Dispatch a raw request body
    pub fn dispatch(&self, body: &[u8], ctx: &RequestContext) -> Reply {
        let dispatched = match decode_envelope(body) {
            Ok(request) => self.dispatch_request(request, ctx),
            Err(rejected) => rejected,
        };
        dispatched.into_reply()
    }

    /// Dispatch an already decoded request
    pub fn dispatch_request(&self, request: Request, ctx: &RequestContext) -> Dispatched {
        let span = tracing::debug_span!(
            "rpc.dispatch",
            method = %request.method,
            correlation_id = %ctx.correlation_id,
        );
        let _enter = span.enter();

        if let Err(rejected) = check_version(&request) {
            return rejected;
        }

        let (_, method) = match self.registry.lookup(&request.method) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(error = %err, "method lookup failed");
                let error = Error::internal(err.to_string()).with_optional_data(request.to_data());
                return Dispatched::bad_request(error, request.id);
            }
        };

        match method.invoke(ctx, request.params()) {
            Ok(result) => {
                tracing::debug!("method call succeeded");
                Dispatched::ok(Response::success(result, request.id))
            }
            Err(InvokeError::Params(err)) => {
                tracing::warn!(error = %err, "invalid params");
                let data = request
                    .params()
                    .and_then(|raw| serde_json::from_str(raw.get()).ok());
                let error = Error::invalid_request(err.to_string()).with_optional_data(data);
                Dispatched::bad_request(error, request.id)
            }
            Err(InvokeError::Handler(error)) => {
                tracing::debug!(
                    code = error.code,
                    message = %error.message,
                    "method returned an error"
                );
                Dispatched::bad_request(error, request.id)
            }
            Err(InvokeError::Encode(err)) => {
                tracing::error!(error = %err, "failed to encode method reply");
                Dispatched::bad_request(Error::internal(err.to_string()), request.id)
            }
        }
    }
}

fn decode_envelope(body: &[u8]) -> Result<Request, Dispatched> {
    serde_json::from_slice::<Request>(body).map_err(|err| {
        tracing::warn!(error = %err, "failed to parse request envelope");
        // keep whatever JSON came in when only the shape was wrong
        let recovered = serde_json::from_slice::<serde_json::Value>(body).ok();
        Dispatched::bad_request(Error::parse(err.to_string()).with_optional_data(recovered), None)
    })
}

fn check_version(request: &Request) -> Result<(), Dispatched> {
    if request.is_valid_version() {
        return Ok(());
    }
    tracing::warn!(version = %request.jsonrpc, "unsupported protocol version");
    let error = Error::invalid_request(format!("jsonrpc must be {VERSION}"))
        .with_optional_data(request.to_data());
    Err(Dispatched::bad_request(error, request.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MethodSet;
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};

    #[derive(Debug, Default, Deserialize)]
    struct TestArgs {
        #[serde(rename = "ID")]
        id: String,
    }

    #[derive(Debug, Default, Serialize)]
    struct TestReply {
        #[serde(rename = "LogID")]
        log_id: String,
    }

    struct DemoApi;

    impl DemoApi {
        fn test(
            &self,
            _ctx: &RequestContext,
            args: &TestArgs,
            reply: &mut TestReply,
        ) -> Result<(), Error> {
            reply.log_id = args.id.clone();
            Ok(())
        }

        fn fail(&self, _: &RequestContext, args: &TestArgs, _: &mut Empty) -> Result<(), Error> {
            Err(Error::new(-32042, "refused").with_data(json!({"id": args.id})))
        }

        fn whoami(&self, ctx: &RequestContext, _: &Empty, reply: &mut String) -> Result<(), Error> {
            *reply = ctx.header("x-user").unwrap_or("anonymous").to_string();
            Ok(())
        }
    }

    impl Service for DemoApi {
        fn methods(&self) -> MethodSet<Self> {
            MethodSet::new()
                .method("Test", DemoApi::test)
                .method("Fail", DemoApi::fail)
                .method("WhoAmI", DemoApi::whoami)
        }
    }

    fn server() -> Server {
        let server = Server::new();
        server.register_service(DemoApi, "demo").unwrap();
        server
    }

    fn call(server: &Server, body: &str) -> (u16, Value) {
        let reply = server.dispatch(body.as_bytes(), &RequestContext::new());
        (reply.status, serde_json::from_slice(&reply.body).unwrap())
    }

    #[test]
    fn test_dispatch_success() {
        let reply = server().dispatch(
            br#"{"jsonrpc":"2.0","method":"demo.Test","params":{"ID":"abc"},"id":1}"#,
            &RequestContext::new(),
        );
        assert_eq!(reply.status, status::OK);
        assert_eq!(
            String::from_utf8(reply.body).unwrap(),
            r#"{"jsonrpc":"2.0","result":{"LogID":"abc"},"id":1}"#
        );
    }

    #[test]
    fn test_positional_params_give_same_result() {
        let server = server();
        let (_, named) =
            call(&server, r#"{"jsonrpc":"2.0","method":"demo.Test","params":{"ID":"x"},"id":1}"#);
        let (status, positional) =
            call(&server, r#"{"jsonrpc":"2.0","method":"demo.Test","params":[{"ID":"x"}],"id":1}"#);
        assert_eq!(status, status::OK);
        assert_eq!(named, positional);
    }

    #[test]
    fn test_absent_params_use_defaults() {
        let (status, body) = call(&server(), r#"{"jsonrpc":"2.0","method":"demo.Test","id":"a"}"#);
        assert_eq!(status, status::OK);
        assert_eq!(body, json!({"jsonrpc": "2.0", "result": {"LogID": ""}, "id": "a"}));
    }

    #[test]
    fn test_wrong_version() {
        let (status, body) = call(&server(), r#"{"jsonrpc":"1.0","method":"demo.Test","id":9}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["error"]["message"], "jsonrpc must be 2.0");
        assert_eq!(body["error"]["data"]["method"], "demo.Test");
        assert_eq!(body["id"], 9);
        assert!(body.get("result").is_none());
    }

    #[test]
    fn test_unknown_method_is_internal_error() {
        let (status, body) = call(&server(), r#"{"jsonrpc":"2.0","method":"ghost.Call","id":2}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], error_codes::INTERNAL_ERROR);
        assert_eq!(body["error"]["message"], r#"can't find service "ghost.Call""#);
        assert_eq!(body["id"], 2);
    }

    #[test]
    fn test_ill_formed_method_is_internal_error() {
        let (status, body) = call(&server(), r#"{"jsonrpc":"2.0","method":"nodot","id":3}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32603);
    }

    #[test]
    fn test_malformed_json() {
        let (status, body) = call(&server(), r#"{"jsonrpc":"2.0","method":"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["id"], Value::Null);
        assert!(body["error"].get("data").is_none());
    }

    #[test]
    fn test_wrong_shape_keeps_recovered_json() {
        let (status, body) = call(&server(), r#"{"jsonrpc":"2.0","method":5,"id":4}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["error"]["data"]["method"], 5);
        assert_eq!(body["id"], Value::Null);
    }

    #[test]
    fn test_missing_method_still_echoes_id() {
        let (status, body) = call(&server(), r#"{"jsonrpc":"2.0","id":5}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32603);
        assert_eq!(body["id"], 5);

        let (_, body) = call(&server(), r#"{"jsonrpc":"2.0","method":null,"id":"m"}"#);
        assert_eq!(body["error"]["code"], -32603);
        assert_eq!(body["id"], "m");
    }

    #[test]
    fn test_null_version_is_invalid_request() {
        let (status, body) = call(&server(), r#"{"jsonrpc":null,"method":"P.Ping","id":5}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["error"]["message"], "jsonrpc must be 2.0");
        assert_eq!(body["id"], 5);
    }

    #[test]
    fn test_undecodable_params() {
        let (status, body) =
            call(&server(), r#"{"jsonrpc":"2.0","method":"demo.Test","params":{"ID":7},"id":5}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["error"]["data"], json!({"ID": 7}));
        assert_eq!(body["id"], 5);
    }

    #[test]
    fn test_handler_error_passed_through() {
        let (status, body) =
            call(&server(), r#"{"jsonrpc":"2.0","method":"demo.Fail","params":{"ID":"q"},"id":6}"#);
        assert_eq!(status, status::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32042, "message": "refused", "data": {"id": "q"}},
                "id": 6
            })
        );
    }

    #[test]
    fn test_context_reaches_method() {
        let ctx = RequestContext::new().with_header("X-User", "alice");
        let reply = server().dispatch(br#"{"jsonrpc":"2.0","method":"demo.WhoAmI","id":7}"#, &ctx);
        let body: Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(body["result"], "alice");
    }

    #[test]
    fn test_string_id_echoed_verbatim() {
        let reply = server().dispatch(
            br#"{"jsonrpc":"2.0","method":"demo.Test","params":{"ID":"z"},"id":"abc-A"}"#,
            &RequestContext::new(),
        );
        let text = String::from_utf8(reply.body).unwrap();
        assert!(text.ends_with(r#""id":"abc-A"}"#), "{text}");
    }

    #[test]
    fn test_prepare() {
        let server = server();
        let request = server
            .prepare(br#"{"jsonrpc":"2.0","method":"demo.Test","id":1}"#)
            .unwrap();
        assert_eq!(request.method, "demo.Test");

        let rejected = server
            .prepare(br#"{"jsonrpc":"1.0","method":"demo.Test","id":1}"#)
            .unwrap_err();
        assert_eq!(rejected.status, status::BAD_REQUEST);
        assert!(rejected.response.error_info().unwrap().is_invalid_request());

        let rejected = server.prepare(b"not json").unwrap_err();
        assert!(rejected.response.error_info().unwrap().is_parse_error());
    }

    #[test]
    fn test_registration_surface() {
        let server = server();
        assert!(server.has_method("demo.Test"));
        assert!(!server.has_method("demo.test"));
        let services = server.list_services();
        assert_eq!(services.len(), 1);
        assert_eq!(services["demo"].method_count(), 3);

        let err = server.register_service(DemoApi, "demo").unwrap_err();
        assert!(matches!(err, RegistrationError::Duplicate(_)));
    }

    #[test]
    fn test_clones_share_registry() {
        let server = Server::new();
        let clone = server.clone();
        server.register_service(DemoApi, "").unwrap();
        assert!(clone.has_method("DemoApi.Test"));
    }
}
