use serde_json::Value;

use crate::error::LanguageModelError;
use crate::types::{
    ModelResponse, ModelTokensDetails, ModelUsage, Part, ReasoningPart, TextPart, ToolCallPart,
};

use super::error::check_refusal;
use super::request::STRUCTURED_OUTPUT_TOOL;
use super::types::{AnthropicContentBlock, AnthropicMessageResponse, AnthropicUsage};

/// Maps a non-streaming Anthropic Messages response to a [`ModelResponse`].
///
/// A completion forced through the synthetic `__structured_output__` tool
/// (see `request::build_request_body`) is unwrapped back into a single text
/// part carrying the JSON-encoded arguments, so callers never see the
/// implementation detail that structured output rides on a tool call here.
pub(crate) fn map_response(
    resp: AnthropicMessageResponse,
) -> Result<ModelResponse, LanguageModelError> {
    check_refusal(resp.stop_reason.as_deref())?;

    let mut content = Vec::with_capacity(resp.content.len());
    for block in resp.content {
        if block.kind == "tool_use" && block.name.as_deref() == Some(STRUCTURED_OUTPUT_TOOL) {
            let args = block.input.unwrap_or(Value::Null);
            content.push(Part::Text(TextPart {
                text: args.to_string(),
                id: None,
            }));
            continue;
        }
        content.push(convert_block(block)?);
    }

    Ok(ModelResponse {
        content,
        usage: resp.usage.as_ref().map(convert_usage),
        cost: None,
    })
}

fn convert_block(block: AnthropicContentBlock) -> Result<Part, LanguageModelError> {
    match block.kind.as_str() {
        "text" => Ok(Part::Text(TextPart {
            text: block.text.unwrap_or_default(),
            id: None,
        })),
        "thinking" => Ok(Part::Reasoning(ReasoningPart {
            text: block.thinking.unwrap_or_default(),
            signature: block.signature,
            id: None,
        })),
        "tool_use" => Ok(Part::ToolCall(ToolCallPart {
            tool_call_id: block.id.unwrap_or_default(),
            tool_name: block.name.unwrap_or_default(),
            args: block.input,
            id: None,
        })),
        other => Err(LanguageModelError::invariant(
            "anthropic_messages",
            format!("unexpected content block type {other:?} in response"),
        )),
    }
}

pub(crate) fn convert_usage(usage: &AnthropicUsage) -> ModelUsage {
    let cache_read = usage.cache_read_input_tokens.unwrap_or(0);
    let cache_creation = usage.cache_creation_input_tokens.unwrap_or(0);
    let input_tokens = usage.input_tokens.unwrap_or(0) + cache_read + cache_creation;

    let input_tokens_details = if cache_read > 0 || cache_creation > 0 {
        Some(ModelTokensDetails {
            text_tokens: Some(input_tokens - cache_read),
            cached_text_tokens: Some(cache_read),
            ..Default::default()
        })
    } else {
        None
    };

    ModelUsage {
        input_tokens,
        output_tokens: usage.output_tokens.unwrap_or(0),
        input_tokens_details,
        output_tokens_details: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(kind: &str) -> AnthropicContentBlock {
        AnthropicContentBlock {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn maps_text_block_to_text_part() {
        let resp = AnthropicMessageResponse {
            id: None,
            r#type: "message".into(),
            model: "claude-3-5-sonnet".into(),
            role: "assistant".into(),
            content: vec![AnthropicContentBlock {
                text: Some("hello".into()),
                ..block("text")
            }],
            stop_reason: Some("end_turn".into()),
            usage: None,
            extra: Default::default(),
        };
        let mapped = map_response(resp).unwrap();
        assert_eq!(mapped.content, vec![Part::text("hello")]);
    }

    #[test]
    fn unwraps_structured_output_tool_call_into_text() {
        let resp = AnthropicMessageResponse {
            id: None,
            r#type: "message".into(),
            model: "claude-3-5-sonnet".into(),
            role: "assistant".into(),
            content: vec![AnthropicContentBlock {
                id: Some("call_1".into()),
                name: Some(STRUCTURED_OUTPUT_TOOL.into()),
                input: Some(json!({"a": 1})),
                ..block("tool_use")
            }],
            stop_reason: Some("tool_use".into()),
            usage: None,
            extra: Default::default(),
        };
        let mapped = map_response(resp).unwrap();
        assert_eq!(mapped.content.len(), 1);
        match &mapped.content[0] {
            Part::Text(text) => {
                let parsed: Value = serde_json::from_str(&text.text).unwrap();
                assert_eq!(parsed, json!({"a": 1}));
            }
            other => panic!("expected text part, got {other:?}"),
        }
    }

    #[test]
    fn refusal_stop_reason_surfaces_as_error() {
        let resp = AnthropicMessageResponse {
            id: None,
            r#type: "message".into(),
            model: "claude-3-5-sonnet".into(),
            role: "assistant".into(),
            content: vec![],
            stop_reason: Some("refusal".into()),
            usage: None,
            extra: Default::default(),
        };
        let err = map_response(resp).unwrap_err();
        assert!(matches!(err, LanguageModelError::Refusal(_, _)));
    }

    #[test]
    fn cache_read_tokens_fold_into_input_tokens_and_details() {
        let usage = AnthropicUsage {
            input_tokens: Some(100),
            output_tokens: Some(20),
            cache_creation_input_tokens: Some(0),
            cache_read_input_tokens: Some(30),
        };
        let mapped = convert_usage(&usage);
        assert_eq!(mapped.input_tokens, 130);
        let details = mapped.input_tokens_details.unwrap();
        assert_eq!(details.cached_text_tokens, Some(30));
        assert_eq!(details.text_tokens, Some(100));
    }
}
