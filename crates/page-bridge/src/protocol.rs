//! Wire shapes of bridge messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which page-side script answers the requests.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeVariant {
    /// Works on the document only.
    #[default]
    Dom,
    /// Works on the host framework's component API.
    App,
}

impl BridgeVariant {
    pub fn request_type(self) -> &'static str {
        match self {
            BridgeVariant::Dom => "NICE_BRIDGE_DOM_REQUEST",
            BridgeVariant::App => "NICE_BRIDGE_REQUEST",
        }
    }

    pub fn response_type(self) -> &'static str {
        match self {
            BridgeVariant::Dom => "NICE_BRIDGE_DOM_RESPONSE",
            BridgeVariant::App => "NICE_BRIDGE_RESPONSE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: String,
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn ok(variant: BridgeVariant, request_id: &str, data: Value) -> Self {
        Self {
            kind: variant.response_type().to_string(),
            request_id: request_id.to_string(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(variant: BridgeVariant, request_id: &str, error: impl Into<String>) -> Self {
        Self {
            kind: variant.response_type().to_string(),
            request_id: request_id.to_string(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// The `type` tag of a raw window message, if any.
pub fn message_type(data: &Value) -> Option<&str> {
    data.get("type").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_page_field_names() {
        let request = BridgeRequest {
            kind: BridgeVariant::Dom.request_type().into(),
            request_id: "req_1_1".into(),
            action: "save".into(),
            payload: json!({}),
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({"type": "NICE_BRIDGE_DOM_REQUEST", "requestId": "req_1_1", "action": "save", "payload": {}})
        );
    }

    #[test]
    fn failed_response_omits_data() {
        let response = BridgeResponse::failed(BridgeVariant::App, "req_1_2", "boom");
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["type"], "NICE_BRIDGE_RESPONSE");
        assert!(wire.get("data").is_none());
        assert_eq!(message_type(&wire), Some("NICE_BRIDGE_RESPONSE"));
    }
}
