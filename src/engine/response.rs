use crate::engine::RawResponse;
use crate::error::TransportError;
use crate::model::Outcome;
use serde_json::Value;

/// Map an answered request to an outcome.
///
/// The body is parsed as JSON regardless of status; a body that does not parse
/// means no structured response was obtained and is reported as a transport
/// failure. Fields other than `response`, `detail`, `thread_id` and `model_used`
/// are ignored.
pub fn interpret(raw: &RawResponse) -> Result<Outcome, TransportError> {
    let body: Value = serde_json::from_slice(&raw.body)?;

    if raw.is_success() {
        let text = match body.get("response") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };
        return Ok(Outcome::Success {
            text,
            thread_id: body.get("thread_id").and_then(Value::as_i64),
            model_used: body
                .get("model_used")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    let detail = match body.get("detail") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        // Validation errors arrive as structured lists.
        Some(other) => Some(other.to_string()),
    };
    Ok(Outcome::Application {
        status: raw.status,
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OutputTone, CONNECTION_FAILURE_MESSAGE};

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: bytes::Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    #[test]
    fn success_uses_response_field() {
        let outcome = interpret(&raw(200, r#"{"response":"OK-42"}"#)).unwrap();
        assert_eq!(outcome.display_text(), "OK-42");
        assert_eq!(outcome.tone(), OutputTone::Neutral);
    }

    #[test]
    fn success_keeps_thread_and_model() {
        let outcome = interpret(&raw(
            201,
            r#"{"thread_id":12,"response":"done","status":"Succès","model_used":"flash"}"#,
        ))
        .unwrap();
        assert_eq!(
            outcome,
            Outcome::Success {
                text: "done".into(),
                thread_id: Some(12),
                model_used: Some("flash".into()),
            }
        );
    }

    #[test]
    fn success_without_response_field_is_empty_text() {
        let outcome = interpret(&raw(200, "{}")).unwrap();
        assert_eq!(outcome.display_text(), "");
        assert!(outcome.is_success());
    }

    #[test]
    fn error_detail_is_passed_through() {
        let outcome = interpret(&raw(422, r#"{"detail":"Invalid file type"}"#)).unwrap();
        let text = outcome.display_text();
        assert!(text.contains("422"));
        assert!(text.contains("Invalid file type"));
        assert_eq!(outcome.tone(), OutputTone::Error);
    }

    #[test]
    fn error_without_detail_uses_fallback() {
        let outcome = interpret(&raw(500, "{}")).unwrap();
        assert_eq!(outcome.display_text(), "Error 500: Unknown error");

        let blank = interpret(&raw(400, r#"{"detail":""}"#)).unwrap();
        assert_eq!(blank.display_text(), "Error 400: Unknown error");
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let outcome =
            interpret(&raw(422, r#"{"detail":[{"loc":["body","files"],"msg":"required"}]}"#))
                .unwrap();
        assert!(outcome.display_text().contains("\"msg\":\"required\""));
    }

    #[test]
    fn malformed_json_is_a_transport_failure() {
        let err = interpret(&raw(502, "<html>Bad Gateway</html>")).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));

        let err = interpret(&raw(200, "")).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
        // Text shown for this case comes from the transport outcome.
        let shown = Outcome::Transport {
            reason: err.to_string(),
        }
        .display_text();
        assert_eq!(shown, CONNECTION_FAILURE_MESSAGE);
    }
}
