//! Parameter decoding.
//!
//! JSON-RPC lets clients send `params` either as an object of named members
//! or as a positional array. Every method here takes exactly one argument
//! shape, so a call is accepted when `params` is that shape itself or a
//! one-element array wrapping it.

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

/// Failure to decode `params` into a method's argument shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParamDecodeError {
    message: String,
}

impl ParamDecodeError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Decode raw `params` into `T`.
///
/// Absent params leave `T` at its default. Otherwise `T` is decoded directly
/// and, failing that, from a one-element array `[T]`. When both fail the
/// error of the array attempt is returned.
pub fn decode_params<T>(raw: Option<&RawValue>) -> Result<T, ParamDecodeError>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = raw else {
        return Ok(T::default());
    };

    match serde_json::from_str::<T>(raw.get()) {
        Ok(value) => Ok(value),
        Err(direct) => {
            tracing::trace!(error = %direct, "params not in argument shape, trying positional");
            serde_json::from_str::<[T; 1]>(raw.get())
                .map(|[value]| value)
                .map_err(|err| ParamDecodeError {
                    message: err.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Args {
        #[serde(rename = "ID")]
        id: String,
    }

    fn raw(s: &str) -> Box<RawValue> {
        RawValue::from_string(s.to_string()).unwrap()
    }

    #[test]
    fn test_absent_params_are_default() {
        let args: Args = decode_params(None).unwrap();
        assert_eq!(args, Args::default());
    }

    #[test]
    fn test_object_params() {
        let params = raw(r#"{"ID":"abc"}"#);
        let args: Args = decode_params(Some(&params)).unwrap();
        assert_eq!(args.id, "abc");
    }

    #[test]
    fn test_positional_fallback_matches_object_form() {
        let positional = raw(r#"[{"ID":"x"}]"#);
        let named = raw(r#"{"ID":"x"}"#);
        let a: Args = decode_params(Some(&positional)).unwrap();
        let b: Args = decode_params(Some(&named)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_positional_primitive() {
        let params = raw("[7]");
        let n: i64 = decode_params(Some(&params)).unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn test_multiple_positional_args_rejected() {
        let params = raw(r#"[{"ID":"x"},{"ID":"y"}]"#);
        let err = decode_params::<Args>(Some(&params)).unwrap_err();
        assert!(!err.message().is_empty());
    }

    #[test]
    fn test_wrong_shape_reports_last_error() {
        let params = raw(r#"{"ID":5}"#);
        let err = decode_params::<Args>(Some(&params)).unwrap_err();
        // the positional attempt is the last one made
        assert!(err.to_string().contains("expected an array"), "{err}");
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let params = raw(r#"[{"ID":"same"}]"#);
        let first: Args = decode_params(Some(&params)).unwrap();
        let second: Args = decode_params(Some(&params)).unwrap();
        assert_eq!(first, second);
    }
}
