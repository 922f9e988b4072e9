use serde::Deserialize;

use crate::error::LanguageModelError;

const PROVIDER: &str = "google_gemini";

/// Parses a non-2xx response body from the Gemini `generateContent` API.
pub(crate) fn parse_gemini_error(status: u16, body: &str) -> LanguageModelError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        status: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(status_text) = error.status.filter(|s| !s.is_empty()) {
                message = format!("{message} ({status_text})");
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
