//! Outbound request frames.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single command sent to the daemon.
///
/// Wire shape: `{"id": <integer>, "command": <string>, "params": <object>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Coarse unix-seconds timestamp, matching the daemon's wire format.
    ///
    /// Not unique: two requests in the same second share an id. Correlation
    /// is by `result.type` on the reply, so this has no routing effect.
    pub id: i64,
    pub command: String,
    pub params: Map<String, Value>,
}

impl Request {
    /// Build a request for `command`, stamping it with the current time.
    ///
    /// `params` defaults to an empty object when absent. Callers that queue
    /// commands while disconnected must call this at send time, not enqueue
    /// time, so the id reflects when the frame actually went out.
    pub fn new(command: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            id: chrono::Utc::now().timestamp(),
            command: command.into(),
            params: params.unwrap_or_default(),
        }
    }

    /// Serialize to the JSON text frame sent on the wire.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_default_to_empty_object() {
        let req = Request::new("peers", None);
        assert_eq!(req.command, "peers");
        assert!(req.params.is_empty());

        let frame = req.to_frame().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["command"], "peers");
        assert_eq!(value["params"], serde_json::json!({}));
        assert!(value["id"].is_i64());
    }

    #[test]
    fn test_explicit_params_are_preserved() {
        let mut params = Map::new();
        params.insert("order_id".into(), Value::from("abc123"));

        let req = Request::new("query_order", Some(params));
        let frame = req.to_frame().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["params"]["order_id"], "abc123");
    }

    #[test]
    fn test_command_keeps_check_prefix_on_the_wire() {
        // Stripping applies to correlation keys only, never the wire command.
        let req = Request::new("check_order_count", None);
        assert_eq!(req.command, "check_order_count");
    }

    #[test]
    fn test_id_is_unix_seconds() {
        let before = chrono::Utc::now().timestamp();
        let req = Request::new("peers", None);
        let after = chrono::Utc::now().timestamp();
        assert!(req.id >= before && req.id <= after);
    }
}
