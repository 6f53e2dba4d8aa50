//! Inbound frame parsing and classification.

use serde_json::Value;
use thiserror::Error;

/// Why an inbound frame could not be routed.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was not valid JSON at all.
    #[error("malformed frame: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but no `result.type` string to correlate on.
    #[error("frame has no result.type field")]
    MissingType,
}

/// Parse a raw text frame into JSON.
///
/// The daemon can push frames of any shape, so this makes no structural
/// demands beyond well-formed JSON; routing requirements are checked
/// separately by [`response_type`].
pub fn parse_frame(text: &str) -> Result<Value, FrameError> {
    Ok(serde_json::from_str(text)?)
}

/// Extract the correlation type from a parsed frame.
///
/// The daemon replies with `{"result": {"type": "...", ...}, ...}`; the
/// `result.type` string is compared as-is against registered keys (the
/// `check_` stripping rule applies on the send side only).
pub fn response_type(payload: &Value) -> Result<&str, FrameError> {
    payload
        .get("result")
        .and_then(|result| result.get("type"))
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingType)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_frame() {
        let payload = parse_frame(r#"{"result":{"type":"peers","data":[]}}"#).unwrap();
        assert_eq!(response_type(&payload).unwrap(), "peers");
    }

    #[test]
    fn test_truncated_text_is_a_parse_error() {
        let err = parse_frame(r#"{"result":{"type":"peers""#).unwrap_err();
        assert!(matches!(err, FrameError::Parse(_)));
    }

    #[test]
    fn test_missing_result_is_not_a_parse_error() {
        let payload = parse_frame(r#"{"status":"ok"}"#).unwrap();
        let err = response_type(&payload).unwrap_err();
        assert!(matches!(err, FrameError::MissingType));
    }

    #[test]
    fn test_non_string_type_is_missing() {
        let payload = json!({"result": {"type": 7}});
        assert!(matches!(
            response_type(&payload),
            Err(FrameError::MissingType)
        ));
    }
}
