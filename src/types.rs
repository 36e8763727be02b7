//! Core JSON-RPC 2.0 envelope types and data structures.

use serde::de::{Deserialize, Deserializer};
use serde::Serialize;
use serde_json::value::RawValue;

/// The only protocol version accepted and emitted.
pub const VERSION: &str = "2.0";

/// Raw, uninterpreted JSON as received on the wire.
///
/// Used for `params` and `id` so the id can be echoed back byte-for-byte.
pub type RawJson = Box<RawValue>;

/// JSON-RPC 2.0 request as received by the server
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct Request {
    /// Protocol version, must be [`VERSION`]
    #[serde(default, deserialize_with = "null_as_empty")]
    pub jsonrpc: String,
    /// Dotted `Service.Method` name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<RawJson>,
    /// Copied into the response as-is, never type checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RawJson>,
}

// Missing and `null` members read as empty so the id can still be echoed.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Request {
    /// Create a new request for the given dotted method name
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            method: method.into(),
            params: None,
            id: None,
        }
    }

    /// Attach parameters, serialized from any value
    pub fn with_params<T: Serialize>(mut self, params: &T) -> Result<Self, serde_json::Error> {
        self.params = Some(serde_json::value::to_raw_value(params)?);
        Ok(self)
    }

    /// Attach an id, serialized from any value
    pub fn with_id<T: Serialize>(mut self, id: &T) -> Result<Self, serde_json::Error> {
        self.id = Some(serde_json::value::to_raw_value(id)?);
        Ok(self)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&RawValue> {
        self.params.as_deref()
    }

    pub fn id(&self) -> Option<&RawValue> {
        self.id.as_deref()
    }

    /// Check the protocol version
    pub fn is_valid_version(&self) -> bool {
        self.jsonrpc == VERSION
    }

    /// Render the request as a JSON value for use as error `data`
    pub fn to_data(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }
}

/// JSON-RPC 2.0 response envelope
///
/// Exactly one of `result` and `error` is set. `id` is always serialized,
/// as `null` when the request could not be parsed far enough to recover one.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    #[serde(default)]
    pub id: Option<RawJson>,
}

// A member that is present but `null` is still present.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Response {
    /// Create a successful response
    pub fn success(result: serde_json::Value, id: Option<RawJson>) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    pub fn error(error: Error, id: Option<RawJson>) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error_info(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn take_error(self) -> Option<Error> {
        self.error
    }

    pub fn id(&self) -> Option<&RawValue> {
        self.id.as_deref()
    }
}

/// JSON-RPC 2.0 error object
///
/// Also the error type returned by service methods. A method error is placed
/// in the response unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Error {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(error_codes::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, message)
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(error_codes::METHOD_NOT_FOUND, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// Generic application error (-32000)
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(error_codes::SERVER_ERROR, message)
    }

    /// Add additional data to the error
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add data only when there is some
    pub fn with_optional_data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    pub fn is_parse_error(&self) -> bool {
        self.code == error_codes::PARSE_ERROR
    }

    pub fn is_invalid_request(&self) -> bool {
        self.code == error_codes::INVALID_REQUEST
    }

    pub fn is_internal_error(&self) -> bool {
        self.code == error_codes::INTERNAL_ERROR
    }

    /// Implementation-defined server error range (-32099..=-32000)
    pub fn is_server_error(&self) -> bool {
        self.code >= -32099 && self.code <= error_codes::SERVER_ERROR
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err.to_string())
    }
}

/// Argument or reply shape for methods that take or return nothing.
///
/// Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Empty {}

/// Standard JSON-RPC 2.0 error codes.
///
/// The values are fixed by the protocol and must match exactly.
///
/// # Example
/// ```rust
/// use jrpc_server::{ErrorBuilder, error_codes};
///
/// let error = ErrorBuilder::new(error_codes::INVALID_PARAMS, "Invalid params").build();
/// assert_eq!(error.code, -32602);
/// ```
pub mod error_codes {
    /// Invalid JSON was received by the server.
    pub const PARSE_ERROR: i32 = -32700;

    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;

    /// The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Generic server error, top of the implementation-defined range.
    pub const SERVER_ERROR: i32 = -32000;
}
