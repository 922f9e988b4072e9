use crate::error::LanguageModelError;

use super::types::CohereErrorEnvelope;

const PROVIDER: &str = "cohere";

/// Parses a non-2xx response body from the Cohere Chat API.
pub(crate) fn parse_cohere_error(status: u16, body: &str) -> LanguageModelError {
    if let Ok(parsed) = serde_json::from_str::<CohereErrorEnvelope>(body) {
        if let Some(message) = parsed.message {
            return LanguageModelError::provider(PROVIDER, status, message, Some(body.to_string()));
        }
    }

    LanguageModelError::provider(
        PROVIDER,
        status,
        format!("unparsed error body: {body}"),
        Some(body.to_string()),
    )
}

/// Detects Cohere's `finish_reason: "ERROR_TOXIC"` / `"ERROR_LIMIT"` refusal
/// sentinels on an otherwise-2xx response.
pub(crate) fn check_refusal(finish_reason: Option<&str>) -> Result<(), LanguageModelError> {
    if matches!(finish_reason, Some("ERROR_TOXIC")) {
        return Err(LanguageModelError::Refusal(
            PROVIDER,
            "model declined to continue the response".to_string(),
        ));
    }
    Ok(())
}
