//! Response envelope decoding.
//!
//! # Responsibilities
//! - Parse `{success, data, errorCode, errorMessage}` bodies
//! - Guarantee a failed envelope always carries an error code
//! - Reshape the untyped payload into the caller's type

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;

/// Structured result exchanged between services.
///
/// Invariant: `success == false` implies a non-empty `error_code`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl<T> ResponseEnvelope<T> {
    /// A successful envelope.
    pub fn ok(data: Option<T>) -> Self {
        Self {
            success: true,
            data,
            error_code: None,
            error_message: None,
        }
    }

    /// A failed envelope. A blank code is replaced by `SERVICE_CALL_ERROR`.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let code = if code.trim().is_empty() {
            ErrorCode::ServiceCallError.as_str().to_string()
        } else {
            code
        };
        Self {
            success: false,
            data: None,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }

    /// A failed envelope with one of this crate's codes.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::failure(code.as_str(), message)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// True when this envelope carries `code`.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.error_code() == Some(code.as_str())
    }

    /// Same status and error fields, payload dropped.
    pub fn without_data<U>(self) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            success: self.success,
            data: None,
            error_code: self.error_code,
            error_message: self.error_message,
        }
    }
}

impl ResponseEnvelope<Value> {
    /// Convert the payload into `U`.
    ///
    /// Only a successful envelope with a non-null payload is converted; any
    /// other envelope keeps its status and error fields and loses the payload.
    pub fn reshape<U: DeserializeOwned>(self) -> Result<ResponseEnvelope<U>, serde_json::Error> {
        match self.data {
            Some(data) if self.success => {
                let shaped = serde_json::from_value(data)?;
                Ok(ResponseEnvelope::ok(Some(shaped)))
            }
            _ => Ok(self.without_data()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Decode a response body into an untyped envelope.
pub fn decode_envelope(body: &[u8]) -> Result<ResponseEnvelope<Value>, serde_json::Error> {
    let wire: WireEnvelope = serde_json::from_slice(body)?;
    let data = (!wire.data.is_null()).then_some(wire.data);

    if wire.success {
        return Ok(ResponseEnvelope {
            success: true,
            data,
            error_code: wire.error_code,
            error_message: wire.error_message,
        });
    }

    let mut envelope = ResponseEnvelope::failure(
        wire.error_code.unwrap_or_default(),
        wire.error_message
            .unwrap_or_else(|| "remote service reported failure".to_string()),
    );
    envelope.data = data;
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Notice {
        id: u64,
        text: String,
    }

    #[test]
    fn test_decode_success() {
        let env = decode_envelope(br#"{"success":true,"data":{"id":1,"text":"hi"}}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.data(), Some(&json!({"id": 1, "text": "hi"})));
        assert_eq!(env.error_code(), None);
    }

    #[test]
    fn test_decode_business_failure_preserves_fields() {
        let env = decode_envelope(
            br#"{"success":false,"data":null,"errorCode":"USER_LOCKED","errorMessage":"locked"}"#,
        )
        .unwrap();
        assert!(!env.is_success());
        assert_eq!(env.error_code(), Some("USER_LOCKED"));
        assert_eq!(env.error_message(), Some("locked"));
        assert!(env.data().is_none());
    }

    #[test]
    fn test_failure_without_code_gets_one() {
        let env = decode_envelope(br#"{"success":false}"#).unwrap();
        assert!(env.has_code(ErrorCode::ServiceCallError));
        assert!(env.error_message().is_some());
    }

    #[test]
    fn test_decode_rejects_non_envelope() {
        assert!(decode_envelope(b"not json").is_err());
        assert!(decode_envelope(br#"{"data":1}"#).is_err());
    }

    #[test]
    fn test_reshape() {
        let env = ResponseEnvelope::ok(Some(json!({"id": 7, "text": "x"})));
        let shaped: ResponseEnvelope<Notice> = env.reshape().unwrap();
        assert_eq!(
            shaped.into_data(),
            Some(Notice {
                id: 7,
                text: "x".into()
            })
        );
    }

    #[test]
    fn test_reshape_passes_through_empty_and_failed() {
        let empty: ResponseEnvelope<Notice> =
            ResponseEnvelope::<Value>::ok(None).reshape().unwrap();
        assert!(empty.is_success());
        assert!(empty.data().is_none());

        let failed: ResponseEnvelope<Notice> =
            ResponseEnvelope::<Value>::failure("E1", "nope").reshape().unwrap();
        assert_eq!(failed.error_code(), Some("E1"));
    }

    #[test]
    fn test_reshape_type_mismatch() {
        let env = ResponseEnvelope::ok(Some(json!("not an object")));
        assert!(env.reshape::<Notice>().is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let env = ResponseEnvelope::<Value>::from_code(ErrorCode::ParamError, "missing path");
        let out = serde_json::to_value(&env).unwrap();
        assert_eq!(out["errorCode"], "PARAM_ERROR");
        assert_eq!(out["success"], false);
    }
}
