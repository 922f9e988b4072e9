use crate::error::LanguageModelError;
use crate::types::{ModelResponse, ModelTokensDetails, ModelUsage, Part};

use super::error::check_refusal;
use super::types::{
    OpenAiChatResponse, OpenAiMessageContent, OpenAiMessagePart, OpenAiResponseMessage,
    OpenAiToolCallResponse, OpenAiUsage,
};

const PROVIDER: &str = "openai_chat";

pub(crate) fn map_response(resp: OpenAiChatResponse) -> Result<ModelResponse, LanguageModelError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LanguageModelError::invariant(PROVIDER, "response has no choices"))?;

    check_refusal(choice.finish_reason.as_deref())?;

    let content = match choice.message {
        Some(message) => convert_response_message(message)?,
        None => Vec::new(),
    };

    let usage = resp.usage.map(convert_usage);

    Ok(ModelResponse {
        content,
        usage,
        cost: None,
    })
}

fn convert_response_message(
    message: OpenAiResponseMessage,
) -> Result<Vec<Part>, LanguageModelError> {
    let mut parts = Vec::new();

    match message.content {
        None => {}
        Some(OpenAiMessageContent::Text(text)) => {
            if !text.is_empty() {
                parts.push(Part::text(text));
            }
        }
        Some(OpenAiMessageContent::Parts(blocks)) => {
            for block in blocks {
                if let Some(part) = convert_content_part_response(&block)? {
                    parts.push(part);
                }
            }
        }
    }

    for call in message.tool_calls.unwrap_or_default() {
        parts.push(convert_tool_call_response(call)?);
    }

    Ok(parts)
}

fn convert_tool_call_response(call: OpenAiToolCallResponse) -> Result<Part, LanguageModelError> {
    if call.kind != "function" {
        return Err(LanguageModelError::invariant(
            PROVIDER,
            format!("unsupported tool call type {}", call.kind),
        ));
    }
    let function = call.function.ok_or_else(|| {
        LanguageModelError::invariant(PROVIDER, "tool call missing function payload")
    })?;
    let name = function.name.unwrap_or_default();
    let args = function
        .arguments
        .as_ref()
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| serde_json::from_str(raw).ok());
    Ok(Part::tool_call(call.id.unwrap_or_default(), name, args))
}

fn convert_content_part_response(
    part: &OpenAiMessagePart,
) -> Result<Option<Part>, LanguageModelError> {
    match part.kind.as_str() {
        "text" => Ok(part.text.clone().map(Part::text)),
        "refusal" => Err(LanguageModelError::Refusal(
            PROVIDER,
            part.text.clone().unwrap_or_else(|| "refused".to_string()),
        )),
        _ => Ok(None),
    }
}

pub(crate) fn convert_usage(usage: OpenAiUsage) -> ModelUsage {
    let input_tokens = usage.prompt_tokens.unwrap_or(0);
    let output_tokens = usage.completion_tokens.unwrap_or(0);

    let output_tokens_details = usage.reasoning_tokens.map(|reasoning| ModelTokensDetails {
        text_tokens: Some(output_tokens.saturating_sub(reasoning)),
        ..Default::default()
    });

    ModelUsage {
        input_tokens,
        output_tokens,
        input_tokens_details: None,
        output_tokens_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::openai_chat::types::{OpenAiResponseChoice, OpenAiToolFunction};

    #[test]
    fn maps_plain_text_choice() {
        let resp = OpenAiChatResponse {
            id: "chatcmpl_1".to_string(),
            object: "chat.completion".to_string(),
            created: None,
            model: "gpt-4o".to_string(),
            choices: vec![OpenAiResponseChoice {
                index: 0,
                message: Some(OpenAiResponseMessage {
                    role: Some("assistant".to_string()),
                    content: Some(OpenAiMessageContent::Text("hello".to_string())),
                    name: None,
                    tool_calls: None,
                }),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(OpenAiUsage {
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                total_tokens: Some(15),
                reasoning_tokens: None,
            }),
            service_tier: None,
            system_fingerprint: None,
        };

        let mapped = map_response(resp).unwrap();
        assert_eq!(mapped.content, vec![Part::text("hello")]);
        assert_eq!(mapped.usage.unwrap().output_tokens, 5);
    }

    #[test]
    fn maps_tool_call_choice() {
        let resp = OpenAiChatResponse {
            id: "chatcmpl_1".to_string(),
            object: "chat.completion".to_string(),
            created: None,
            model: "gpt-4o".to_string(),
            choices: vec![OpenAiResponseChoice {
                index: 0,
                message: Some(OpenAiResponseMessage {
                    role: Some("assistant".to_string()),
                    content: None,
                    name: None,
                    tool_calls: Some(vec![OpenAiToolCallResponse {
                        id: Some("call_1".to_string()),
                        kind: "function".to_string(),
                        function: Some(OpenAiToolFunction {
                            name: Some("search".to_string()),
                            arguments: Some("{\"q\":\"rust\"}".to_string()),
                        }),
                    }]),
                }),
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: None,
            service_tier: None,
            system_fingerprint: None,
        };

        let mapped = map_response(resp).unwrap();
        match &mapped.content[0] {
            Part::ToolCall(call) => {
                assert_eq!(call.tool_call_id, "call_1");
                assert_eq!(call.tool_name, "search");
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn content_filter_finish_reason_is_refusal() {
        let resp = OpenAiChatResponse {
            id: "chatcmpl_1".to_string(),
            object: "chat.completion".to_string(),
            created: None,
            model: "gpt-4o".to_string(),
            choices: vec![OpenAiResponseChoice {
                index: 0,
                message: Some(OpenAiResponseMessage {
                    role: Some("assistant".to_string()),
                    content: None,
                    name: None,
                    tool_calls: None,
                }),
                finish_reason: Some("content_filter".to_string()),
            }],
            usage: None,
            service_tier: None,
            system_fingerprint: None,
        };

        let err = map_response(resp).unwrap_err();
        assert!(matches!(err, LanguageModelError::Refusal(_, _)));
    }
}
