//! JSON shapes of the WebDriver wire protocol.

use serde::Deserialize;

/// Every response body is wrapped in `{"value": ...}`.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub value: T,
}

/// `value` of a failed command, e.g. `{"error": "no such element", ...}`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorValue {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct NewSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Element reference, serialized under the W3C element identifier key.
#[derive(Debug, Deserialize)]
pub(super) struct RawElement {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    pub id: String,
}
