//! Convenience macros for building error objects and requests.

/// Create an error object with code, message and optional data
///
/// Service methods return these directly:
/// ```rust
/// use jrpc_server::{error_codes, rpc_error, Error};
///
/// fn check(n: i64) -> Result<(), Error> {
///     if n < 0 {
///         return Err(rpc_error!(error_codes::INVALID_PARAMS, "n must be positive", {"n": n}));
///     }
///     Ok(())
/// }
///
/// assert_eq!(check(-1).unwrap_err().code, -32602);
/// ```
#[macro_export]
macro_rules! rpc_error {
    ($code:expr_2021, $message:expr_2021, $data:tt) => {
        $crate::ErrorBuilder::new($code, $message)
            .data(serde_json::json!($data))
            .build()
    };
    ($code:expr_2021, $message:expr_2021) => {
        $crate::ErrorBuilder::new($code, $message).build()
    };
}

/// Create a server error (-32000) from a format string
///
/// ```text
/// return Err(rpc_server_error!("account {} is locked", account_id));
/// ```
#[macro_export]
macro_rules! rpc_server_error {
    ($($arg:tt)+) => {
        $crate::Error::server(format!($($arg)+))
    };
}

/// Build a request envelope from JSON literals
///
/// ```text
/// let request = rpc_request!("demo.Test", {"ID": "abc"}, 1);
/// ```
#[macro_export]
macro_rules! rpc_request {
    ($method:expr_2021, $params:tt, $id:tt) => {
        $crate::Request {
            jsonrpc: $crate::VERSION.to_string(),
            method: ($method).to_string(),
            params: serde_json::value::to_raw_value(&serde_json::json!($params)).ok(),
            id: serde_json::value::to_raw_value(&serde_json::json!($id)).ok(),
        }
    };
    ($method:expr_2021, $params:tt) => {
        $crate::Request {
            jsonrpc: $crate::VERSION.to_string(),
            method: ($method).to_string(),
            params: serde_json::value::to_raw_value(&serde_json::json!($params)).ok(),
            id: None,
        }
    };
}
