use thiserror::Error;

/// Aggregates every failure mode exposed by the provider adapters and the
/// agent run loop.
///
/// Callers can match on the specific variant to decide whether to surface an
/// actionable message, retry at the application level, or treat the failure
/// as a library/provider bug.
#[derive(Debug, Error)]
pub enum LanguageModelError {
    /// Caller supplied a value the library rejects before any network call
    /// (empty `messages`, a conversation with a dangling `tool_call_id`, …).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A well-formed request asks for a capability the selected provider
    /// cannot serve (e.g. audio output on a text-only model).
    #[error("unsupported on {0}: {1}")]
    Unsupported(&'static str, String),
    /// The code path is intentionally unfinished.
    #[error("not implemented on {0}: {1}")]
    NotImplemented(&'static str, String),
    /// The provider returned a non-2xx response.
    #[error("provider {provider} returned {status}: {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        message: String,
        /// Raw, decoded response body, kept for debugging.
        body: Option<String>,
    },
    /// The provider returned 2xx but with an explicit refusal sentinel.
    #[error("provider {0} refused the request: {1}")]
    Refusal(&'static str, String),
    /// The provider returned something the adapter cannot reconcile with its
    /// own contract — a library or provider bug, not a caller mistake.
    #[error("invariant violated in {0}: {1}")]
    Invariant(&'static str, String),
    /// Network, DNS, TLS, or I/O error.
    #[error("transport error: {0}")]
    Transport(String),
    /// The caller cancelled; no attempt is made to complete.
    #[error("cancelled: {0}")]
    Cancelled(String),
    /// Agent-only: a Run hit its configured `max_turns` with outstanding
    /// tool calls. `items` carries every [`crate::agent::AgentItem`]
    /// produced before the limit was hit (the model item and any tool
    /// items from the final turn included), so a non-streaming caller can
    /// still recover the Run's progress.
    #[error("max turns ({max_turns}) exceeded")]
    MaxTurnsExceeded {
        max_turns: u32,
        items: Vec<crate::agent::AgentItem>,
    },
}

pub type LanguageModelResult<T> = Result<T, LanguageModelError>;

impl LanguageModelError {
    /// Creates a [`LanguageModelError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_bridge::error::LanguageModelError;
    ///
    /// let err = LanguageModelError::transport("dns lookup failed");
    /// assert!(matches!(err, LanguageModelError::Transport(_)));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a [`LanguageModelError::Provider`] with the given provider
    /// name, HTTP status, and decoded body.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_bridge::error::LanguageModelError;
    ///
    /// let err = LanguageModelError::provider("openai_chat", 429, "rate limited", None);
    /// assert!(matches!(err, LanguageModelError::Provider { provider: "openai_chat", status: 429, .. }));
    /// ```
    pub fn provider<T: Into<String>>(
        provider: &'static str,
        status: u16,
        message: T,
        body: Option<String>,
    ) -> Self {
        Self::Provider {
            provider,
            status,
            message: message.into(),
            body,
        }
    }

    pub fn invariant<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Invariant(provider, message.into())
    }

    pub fn unsupported<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Unsupported(provider, message.into())
    }

    pub fn not_implemented<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::NotImplemented(provider, message.into())
    }
}

/// Returns `true` when an error code or message suggests a context/window
/// overflow. Kept for provider error-envelope classification; the library
/// does not act on this itself (no retry policy is implemented), it only
/// enriches the `Provider` message for callers who choose to.
pub(crate) fn looks_like_token_limit_error(code_hint: Option<&str>, message: &str) -> bool {
    if let Some(code) = code_hint {
        let lower = code.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "context_length_exceeded"
                | "max_context_length_exceeded"
                | "prompt_tokens_exceeded"
                | "context_window_exceeded"
        ) || lower.contains("token")
        {
            return true;
        }
    }

    let lower_message = message.to_ascii_lowercase();
    const HINTS: [&str; 6] = [
        "context length",
        "context window",
        "token limit",
        "maximum output tokens",
        "max output tokens",
        "prompt is too long",
    ];
    HINTS.iter().any(|needle| lower_message.contains(needle))
}

/// Attempts to extract a model identifier from an error payload, used by
/// provider error-envelope parsers to enrich `Provider` messages.
pub(crate) fn extract_model_identifier(message: &str) -> Option<String> {
    for delimiter in ['`', '"', '\''] {
        if let Some(value) = between_delimiters(message, delimiter) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

fn between_delimiters(message: &str, delimiter: char) -> Option<String> {
    let mut chars = message.char_indices();
    while let Some((start, ch)) = chars.next() {
        if ch == delimiter {
            let start_idx = start + ch.len_utf8();
            if start_idx >= message.len() {
                return None;
            }
            if let Some(rel_end) = message[start_idx..].find(delimiter) {
                let end_idx = start_idx + rel_end;
                return Some(message[start_idx..end_idx].to_string());
            }
        }
    }
    None
}
