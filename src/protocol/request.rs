//! Request and Response message types.
//!
//! Defines the JSON-RPC message format exchanged over the WebSocket
//! between this client and the inspector.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::Command;

// ============================================================================
// RpcRequest
// ============================================================================

/// A method call from this client to the inspector.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Runtime.evaluate",
///   "params": { "expression": "6*7", "returnByValue": true }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    /// Identifier echoed back in the response.
    pub id: RequestId,

    /// Method name in `Domain.methodName` format.
    pub method: String,

    /// Method parameters.
    pub params: Value,
}

impl RpcRequest {
    /// Creates a request from a method name and parameters.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Creates a request from a typed [`Command`].
    ///
    /// Commands without parameters get an empty params object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the command does not serialize to
    /// a `method`/`params` pair.
    pub fn from_command(id: RequestId, command: &Command) -> Result<Self> {
        let Value::Object(mut body) = serde_json::to_value(command)? else {
            return Err(Error::protocol("command did not serialize to an object"));
        };

        let method = match body.remove("method") {
            Some(Value::String(method)) => method,
            _ => return Err(Error::protocol("command has no method name")),
        };
        let params = body
            .remove("params")
            .unwrap_or_else(|| Value::Object(Map::new()));

        Ok(Self { id, method, params })
    }
}

// ============================================================================
// RpcResponse
// ============================================================================

/// A response from the inspector.
///
/// Keeps the parsed frame as received next to the typed fields, so
/// serializing a response reproduces every member the inspector sent,
/// including `"result": null` and fields this client does not model.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 1, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 1, "error": { "code": -32601, "message": "..." } }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Result data (if success).
    pub result: Option<Value>,

    /// Error data (if error).
    pub error: Option<Value>,

    raw: Value,
}

/// Typed members read out of a response frame.
#[derive(Deserialize)]
struct ResponseFields {
    id: RequestId,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl RpcResponse {
    /// Builds a response from a parsed frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the frame has no numeric `id`.
    pub fn from_value(raw: Value) -> Result<Self> {
        let fields = ResponseFields::deserialize(&raw)?;

        Ok(Self {
            id: fields.id,
            result: fields.result,
            error: fields.error,
            raw,
        })
    }

    /// The frame exactly as the inspector sent it.
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Consumes the response, returning the frame as sent.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.raw
    }

    /// Gets a nested value from the result by JSON pointer.
    ///
    /// `response.pointer("/result/value")` reads the value of an evaluation.
    #[inline]
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.result.as_ref().and_then(|v| v.pointer(pointer))
    }
}

impl Serialize for RpcResponse {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RpcResponse {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = RpcRequest::new(
            RequestId::first(),
            "Runtime.evaluate",
            json!({"expression": "6*7", "returnByValue": true}),
        );
        let json = serde_json::to_string(&request).expect("serialize");

        assert_eq!(
            json,
            r#"{"id":1,"method":"Runtime.evaluate","params":{"expression":"6*7","returnByValue":true}}"#
        );
    }

    #[test]
    fn test_request_from_command() {
        let request =
            RpcRequest::from_command(RequestId::first(), &Command::evaluate("1+1")).expect("build");

        assert_eq!(request.method, "Runtime.evaluate");
        assert_eq!(request.params["expression"], "1+1");
        assert_eq!(request.params["returnByValue"], true);
    }

    #[test]
    fn test_success_response() {
        let response: RpcResponse =
            serde_json::from_str(r#"{"id":1,"result":{"value":42}}"#).expect("parse");

        assert_eq!(response.id, RequestId::first());
        assert!(response.error.is_none());
        assert_eq!(response.pointer("/value"), Some(&json!(42)));
    }

    #[test]
    fn test_error_response() {
        let response: RpcResponse = serde_json::from_str(
            r#"{"id":1,"error":{"code":-32601,"message":"'Foo.bar' wasn't found"}}"#,
        )
        .expect("parse");

        assert!(response.result.is_none());
        assert_eq!(response.error.as_ref().map(|e| &e["code"]), Some(&json!(-32601)));
    }

    #[test]
    fn test_response_reserializes_verbatim() {
        let text = r#"{"id":1,"result":{"value":42}}"#;
        let response: RpcResponse = serde_json::from_str(text).expect("parse");

        assert_eq!(serde_json::to_string(&response).expect("serialize"), text);
    }

    #[test]
    fn test_null_result_is_kept() {
        let text = r#"{"id":1,"result":null}"#;
        let response: RpcResponse = serde_json::from_str(text).expect("parse");

        assert!(response.result.is_none());
        assert_eq!(response.as_value(), &json!({"id": 1, "result": null}));
        assert_eq!(serde_json::to_string(&response).expect("serialize"), text);
    }

    #[test]
    fn test_unmodelled_fields_are_kept() {
        let raw = json!({"id": 1, "result": {"value": 1}, "sessionId": "s"});
        let response = RpcResponse::from_value(raw.clone()).expect("parse");

        assert_eq!(response.pointer("/value"), Some(&json!(1)));
        assert_eq!(serde_json::to_value(&response).expect("serialize"), raw);
        assert_eq!(response.into_value(), raw);
    }

    #[test]
    fn test_response_without_id_rejected() {
        assert!(RpcResponse::from_value(json!({"result": {}})).is_err());
        assert!(serde_json::from_str::<RpcResponse>(r#"{"id":"one"}"#).is_err());
    }
}
