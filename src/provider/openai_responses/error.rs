use serde::Deserialize;

use crate::error::LanguageModelError;

/// Parses an OpenAI error envelope (`{"error": {"message", "type", "code"}}`)
/// returned alongside a non-2xx status into a [`LanguageModelError::Provider`]
/// (§4.2: non-2xx is always `Provider`, never reinterpreted as a caller
/// mistake).
pub(crate) fn parse_openai_responses_error(status: u16, body: &str) -> LanguageModelError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|error| error.message)
        .unwrap_or_else(|| body.to_string());

    LanguageModelError::provider("openai.responses", status, message, Some(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_from_error_envelope() {
        let body = r#"{"error":{"message":"invalid api key","type":"invalid_request_error"}}"#;
        let err = parse_openai_responses_error(401, body);
        match err {
            LanguageModelError::Provider { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid api key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_body_when_unparseable() {
        let err = parse_openai_responses_error(500, "internal error");
        match err {
            LanguageModelError::Provider { message, .. } => assert_eq!(message, "internal error"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
