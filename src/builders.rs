//! Builder patterns for response envelopes and error objects.

use crate::types::*;
use serde::Serialize;

/// Builder for JSON-RPC responses
///
/// An error always wins over a result, so the built envelope carries exactly
/// one of the two. Without either, the result is `null`.
#[derive(Default)]
pub struct ResponseBuilder {
    result: Option<serde_json::Value>,
    error: Option<Error>,
    id: Option<RawJson>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set successful result
    pub fn success(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Set error
    pub fn error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }

    /// Set the id echoed from the request
    pub fn id(mut self, id: Option<RawJson>) -> Self {
        self.id = id;
        self
    }

    pub fn build(self) -> Response {
        match self.error {
            Some(error) => Response::error(error, self.id),
            None => Response::success(self.result.unwrap_or(serde_json::Value::Null), self.id),
        }
    }
}

/// Builder for JSON-RPC errors
pub struct ErrorBuilder {
    code: i32,
    message: String,
    data: Option<serde_json::Value>,
}

impl ErrorBuilder {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Add additional error data
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add error data serialized from any value; unserializable data is dropped
    pub fn data_from<T: Serialize>(mut self, data: &T) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    pub fn build(self) -> Error {
        Error {
            code: self.code,
            message: self.message,
            data: self.data,
        }
    }
}
