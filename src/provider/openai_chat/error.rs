use serde::Deserialize;
use serde_json::Value;

use crate::error::LanguageModelError;

const PROVIDER: &str = "openai_chat";

/// Parses a non-2xx response body from the OpenAI Chat Completions API.
pub(crate) fn parse_openai_error(status: u16, body: &str) -> LanguageModelError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        r#type: Option<String>,
        code: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(kind) = error.r#type {
                message = format!("{kind}: {message}");
            }
            if let Some(code) = error.code {
                message = format!("{message} ({code})");
            }
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

/// Detects OpenAI's content-filter finish reason, surfaced as [`LanguageModelError::Refusal`].
pub(crate) fn check_refusal(finish_reason: Option<&str>) -> Result<(), LanguageModelError> {
    if finish_reason == Some("content_filter") {
        return Err(LanguageModelError::Refusal(
            PROVIDER,
            "response was blocked by the content filter".to_string(),
        ));
    }
    Ok(())
}
