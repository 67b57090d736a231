use serde_json::Value;
use tracing::debug;

use super::transport::{ApiResponse, Body};
use crate::devalue;
use crate::error::{ClientError, DecodeStage};

/// Which tRPC procedure produced an envelope. Only affects wording of
/// failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    Search,
    Conversation,
}

impl Procedure {
    fn missing_data(self) -> ClientError {
        match self {
            Procedure::Search => ClientError::MissingData { context: "search " },
            Procedure::Conversation => ClientError::MissingData { context: "" },
        }
    }

    fn unknown_error(self) -> &'static str {
        match self {
            Procedure::Search => "Unknown search error",
            Procedure::Conversation => "Unknown Sweetistics error",
        }
    }

    fn decode_stage(self) -> DecodeStage {
        match self {
            Procedure::Search => DecodeStage::Search,
            Procedure::Conversation => DecodeStage::Response,
        }
    }
}

/// Fail on any non-2xx status without looking at the body.
pub fn check_status(status: u16) -> Result<(), ClientError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(ClientError::Http(status))
    }
}

/// Parse a body that may already be structured.
pub fn parse_body(body: Body) -> Result<Value, ClientError> {
    match body {
        Body::Json(value) => Ok(value),
        Body::Text(text) => {
            serde_json::from_str(&text).map_err(|e| ClientError::Parse(e.to_string()))
        }
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Strip the batched tRPC envelope down to its success payload.
pub fn unwrap_envelope(response: ApiResponse, procedure: Procedure) -> Result<Value, ClientError> {
    check_status(response.status)?;
    let body = parse_body(response.body)?;

    let mut envelope = match body {
        Value::Array(mut batch) => {
            if batch.is_empty() {
                Value::Null
            } else {
                batch.swap_remove(0)
            }
        }
        other => other,
    };

    if let Some(error) = envelope.get("error").filter(|e| is_truthy(e)) {
        // tRPC nests the serialized error under `json` in batched replies.
        let message = error
            .get("message")
            .or_else(|| error.pointer("/json/message"))
            .and_then(Value::as_str)
            .unwrap_or(procedure.unknown_error());
        return Err(ClientError::Envelope(message.to_string()));
    }

    let data = match envelope.pointer_mut("/result/data").map(Value::take) {
        Some(data) if is_truthy(&data) => data,
        _ => envelope
            .get_mut("data")
            .map(Value::take)
            .filter(is_truthy)
            .ok_or_else(|| procedure.missing_data())?,
    };

    decode_payload(data, procedure)
}

/// Expand a string-encoded payload; structured payloads pass through.
pub fn decode_payload(data: Value, procedure: Procedure) -> Result<Value, ClientError> {
    match data {
        Value::String(encoded) => {
            let decoded = devalue::parse(&encoded).map_err(|e| ClientError::Decode {
                stage: procedure.decode_stage(),
                message: e.to_string(),
            })?;
            debug!(bytes = encoded.len(), "decoded structured payload");
            Ok(decoded.into_json())
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: Body::Text(body.to_string()),
        }
    }

    #[test]
    fn test_status_beats_error_body() {
        let response = text(403, r#"{"error":{"message":"forbidden"}}"#);
        assert_eq!(
            unwrap_envelope(response, Procedure::Search),
            Err(ClientError::Http(403))
        );
    }

    #[test]
    fn test_status_beats_unparseable_body() {
        assert_eq!(
            unwrap_envelope(text(502, "<html>"), Procedure::Conversation),
            Err(ClientError::Http(502))
        );
    }

    #[test]
    fn test_parse_failure_carries_parser_message() {
        let err = unwrap_envelope(text(200, "not json"), Procedure::Search).unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
        assert!(err
            .to_string()
            .starts_with("Sweetistics response parse failed: "));
    }

    #[test]
    fn test_batched_error_uses_message() {
        let response = text(200, r#"[{"error":{"message":"rate limited"}}]"#);
        assert_eq!(
            unwrap_envelope(response, Procedure::Search),
            Err(ClientError::Envelope("rate limited".to_string()))
        );
    }

    #[test]
    fn test_error_without_message_is_generic() {
        let response = text(200, r#"{"error":{"code":-32600}}"#);
        assert_eq!(
            unwrap_envelope(response, Procedure::Search),
            Err(ClientError::Envelope("Unknown search error".to_string()))
        );
    }

    #[test]
    fn test_batched_error_nested_under_json() {
        let response = text(200, r#"[{"error":{"json":{"message":"UNAUTHORIZED"}}}]"#);
        assert_eq!(
            unwrap_envelope(response, Procedure::Conversation),
            Err(ClientError::Envelope("UNAUTHORIZED".to_string()))
        );
    }

    #[test]
    fn test_empty_batch_is_missing_data() {
        let err = unwrap_envelope(text(200, "[]"), Procedure::Search).unwrap_err();
        assert_eq!(err.to_string(), "Missing data in Sweetistics search response");
        let err = unwrap_envelope(text(200, "{}"), Procedure::Conversation).unwrap_err();
        assert_eq!(err.to_string(), "Missing data in Sweetistics response");
    }

    #[test]
    fn test_structured_data_passes_through() {
        let response = ApiResponse {
            status: 200,
            body: Body::Json(json!([{"result": {"data": {"tweets": {"items": []}}}}])),
        };
        assert_eq!(
            unwrap_envelope(response, Procedure::Search),
            Ok(json!({"tweets": {"items": []}}))
        );
    }

    #[test]
    fn test_top_level_data_is_accepted() {
        let response = text(200, r#"{"data":{"tweetIds":[]}}"#);
        assert_eq!(
            unwrap_envelope(response, Procedure::Conversation),
            Ok(json!({"tweetIds": []}))
        );
    }

    #[test]
    fn test_string_data_is_decoded() {
        let encoded = r#"[{"tweetIds":1},[2],"9"]"#;
        let body = json!({"result": {"data": encoded}}).to_string();
        assert_eq!(
            unwrap_envelope(text(200, &body), Procedure::Conversation),
            Ok(json!({"tweetIds": ["9"]}))
        );
    }

    #[test]
    fn test_decode_failure_names_stage() {
        let body = json!({"result": {"data": "{broken"}}).to_string();
        let err = unwrap_envelope(text(200, &body), Procedure::Conversation).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Sweetistics response decode failed: "));
        let err = unwrap_envelope(text(200, &body), Procedure::Search).unwrap_err();
        assert!(err.to_string().starts_with("Sweetistics search decode failed: "));
    }
}
