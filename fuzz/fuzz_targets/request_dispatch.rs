#![no_main]

use jrpc_server::{Empty, Error, MethodSet, RequestContext, Server, Service};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

struct Echo;

impl Echo {
    fn value(&self, _: &RequestContext, args: &Value, out: &mut Value) -> Result<(), Error> {
        *out = args.clone();
        Ok(())
    }

    fn nothing(&self, _: &RequestContext, _: &Empty, _: &mut Empty) -> Result<(), Error> {
        Ok(())
    }
}

impl Service for Echo {
    fn methods(&self) -> MethodSet<Self> {
        MethodSet::new()
            .method("Value", Echo::value)
            .method("Nothing", Echo::nothing)
    }
}

fuzz_target!(|data: &[u8]| {
    let server = Server::new();
    let _ = server.register_service(Echo, "");

    let reply = server.dispatch(data, &RequestContext::new());
    assert!(reply.status == 200 || reply.status == 400);
    let body: Value = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(body["jsonrpc"], "2.0");
    assert!(body.get("result").is_some() != body.get("error").is_some());
});
