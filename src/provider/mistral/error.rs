use serde::Deserialize;
use serde_json::Value;

use crate::error::LanguageModelError;

const PROVIDER: &str = "mistral";

/// Parses a non-2xx response body from the Mistral Chat Completions API.
///
/// Mistral's error envelope is flatter than OpenAI's — `message`/`type`/`code`
/// sit at the top level rather than nested under an `error` key.
pub(crate) fn parse_mistral_error(status: u16, body: &str) -> LanguageModelError {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<Value>,
        r#type: Option<String>,
        code: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if parsed.message.is_some() || parsed.r#type.is_some() {
            let mut message = match parsed.message {
                Some(Value::String(text)) => text,
                Some(other) => other.to_string(),
                None => "unknown error".to_string(),
            };
            if let Some(kind) = parsed.r#type {
                message = format!("{kind}: {message}");
            }
            if let Some(code) = parsed.code {
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

/// Mistral has no dedicated content-filter finish reason comparable to
/// OpenAI's; `finish_reason == "error"` is the closest analog.
pub(crate) fn check_refusal(finish_reason: Option<&str>) -> Result<(), LanguageModelError> {
    if finish_reason == Some("error") {
        return Err(LanguageModelError::Refusal(
            PROVIDER,
            "response was blocked or errored during generation".to_string(),
        ));
    }
    Ok(())
}
