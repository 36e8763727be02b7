#![no_main]

use jrpc_server::decode_params;
use libfuzzer_sys::fuzz_target;
use serde::Deserialize;
use serde_json::value::RawValue;

#[derive(Debug, Default, Deserialize)]
#[allow(dead_code)]
struct Args {
    name: String,
    count: Option<u32>,
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(raw) = serde_json::from_str::<Box<RawValue>>(text) else {
        return;
    };

    let _ = decode_params::<Args>(Some(&raw));
    let _ = decode_params::<Vec<i64>>(Some(&raw));
    let _ = decode_params::<serde_json::Value>(Some(&raw));
});
