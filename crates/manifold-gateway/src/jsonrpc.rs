//! JSON-RPC 2.0 envelope passed through the gateway.
//!
//! The gateway never interprets method names or payloads; it only needs
//! the envelope fields, and of those only `id` is ever touched. Every
//! field is optional so that requests, responses, and notifications all
//! round-trip through the same type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 message in any of its shapes.
///
/// `id` is an opaque correlation token — number, string, or absent.
/// Absent (or null) means notification: never individually routable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl RpcMessage {
    /// Whether this message carries a routable correlation id.
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_request() {
        let json = r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{"a":1}}"#;
        let msg: RpcMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.jsonrpc.as_deref(), Some("2.0"));
        assert_eq!(msg.id, Some(Value::from(1)));
        assert_eq!(msg.method.as_deref(), Some("ping"));
        assert_eq!(msg.params.unwrap()["a"], 1);
        assert!(msg.result.is_none());
    }

    #[test]
    fn deserialize_response_with_result() {
        let json = r#"{"jsonrpc":"2.0","id":"abc","result":{"tools":[]}}"#;
        let msg: RpcMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, Some(Value::String("abc".into())));
        assert!(msg.result.is_some());
        assert!(msg.error.is_none());
    }

    #[test]
    fn deserialize_response_with_error() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"no"}}"#;
        let msg: RpcMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.error.unwrap()["code"], -32601);
    }

    #[test]
    fn notification_has_no_id() {
        let json = r#"{"jsonrpc":"2.0","method":"notifications/progress"}"#;
        let msg: RpcMessage = serde_json::from_str(json).unwrap();
        assert!(!msg.has_id());
    }

    #[test]
    fn null_id_treated_as_notification() {
        let json = r#"{"jsonrpc":"2.0","id":null,"method":"x"}"#;
        let msg: RpcMessage = serde_json::from_str(json).unwrap();
        assert!(!msg.has_id());
    }

    #[test]
    fn absent_fields_are_omitted_on_serialize() {
        let msg = RpcMessage {
            jsonrpc: Some("2.0".into()),
            method: Some("ping".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"jsonrpc":"2.0","method":"ping"}));
    }

    #[test]
    fn roundtrip_preserves_payload() {
        let json = r#"{"jsonrpc":"2.0","id":7,"result":{"content":[{"type":"text","text":"hi"}]}}"#;
        let msg: RpcMessage = serde_json::from_str(json).unwrap();
        let out: Value = serde_json::to_value(&msg).unwrap();
        let original: Value = serde_json::from_str(json).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn rejects_non_object() {
        assert!(serde_json::from_str::<RpcMessage>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<RpcMessage>("not json").is_err());
    }
}
