#![no_main]

use jrpc_server::{Empty, Error, MethodSet, Registry, RequestContext, Service};
use libfuzzer_sys::fuzz_target;

struct Pinger;

impl Pinger {
    fn ping(&self, _: &RequestContext, _: &Empty, _: &mut Empty) -> Result<(), Error> {
        Ok(())
    }
}

impl Service for Pinger {
    fn methods(&self) -> MethodSet<Self> {
        MethodSet::new().method("Ping", Pinger::ping)
    }
}

fuzz_target!(|data: &[u8]| {
    let method_name = String::from_utf8_lossy(data);

    let registry = Registry::new();
    let _ = registry.register(Pinger, "");
    let found = registry.lookup(&method_name).is_ok();
    assert_eq!(found, method_name == "Pinger.Ping");
    assert_eq!(registry.has_method(&method_name), found);

    let _ = registry.register(Pinger, &method_name);
    let _ = registry.method_names();
});
