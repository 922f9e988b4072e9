use crate::error::LanguageModelError;

use super::types::AnthropicErrorEnvelope;

/// Parses a non-2xx response body from the Anthropic Messages API.
pub(crate) fn parse_anthropic_error(status: u16, body: &str) -> LanguageModelError {
    if let Ok(parsed) = serde_json::from_str::<AnthropicErrorEnvelope>(body) {
        if let Some(error) = parsed.error {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            let message = match error.r#type {
                Some(kind) => format!("{kind}: {message}"),
                None => message,
            };
            return LanguageModelError::provider("anthropic_messages", status, message, Some(body.to_string()));
        }
    }

    LanguageModelError::provider(
        "anthropic_messages",
        status,
        format!("unparsed error body: {body}"),
        Some(body.to_string()),
    )
}

/// Detects Anthropic's `stop_reason: "refusal"` sentinel on an otherwise-2xx
/// response, surfaced as the distinct `Refusal` error kind per §9.
pub(crate) fn check_refusal(stop_reason: Option<&str>) -> Result<(), LanguageModelError> {
    if stop_reason == Some("refusal") {
        return Err(LanguageModelError::Refusal(
            "anthropic_messages",
            "model declined to continue the response".to_string(),
        ));
    }
    Ok(())
}
