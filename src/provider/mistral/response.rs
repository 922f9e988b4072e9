use crate::error::LanguageModelError;
use crate::types::{ModelResponse, ModelUsage, Part};

use super::error::check_refusal;
use super::types::{
    MistralChatResponse, MistralMessageContent, MistralMessagePart, MistralResponseMessage,
    MistralToolCallResponse, MistralUsage,
};

const PROVIDER: &str = "mistral";

pub(crate) fn map_response(resp: MistralChatResponse) -> Result<ModelResponse, LanguageModelError> {
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
    message: MistralResponseMessage,
) -> Result<Vec<Part>, LanguageModelError> {
    // Mistral's citation support is only partially documented; rather than
    // silently drop or mis-map it, surface it as unimplemented.
    if message.citations.is_some() {
        return Err(LanguageModelError::not_implemented(
            PROVIDER,
            "citation mapping is not implemented for the Mistral adapter",
        ));
    }

    let mut parts = Vec::new();

    match message.content {
        None => {}
        Some(MistralMessageContent::Text(text)) => {
            if !text.is_empty() {
                parts.push(Part::text(text));
            }
        }
        Some(MistralMessageContent::Parts(blocks)) => {
            for block in blocks {
                if let Some(part) = convert_content_part_response(&block) {
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

fn convert_tool_call_response(call: MistralToolCallResponse) -> Result<Part, LanguageModelError> {
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

fn convert_content_part_response(part: &MistralMessagePart) -> Option<Part> {
    match part.kind.as_str() {
        "text" => part.text.clone().map(Part::text),
        _ => None,
    }
}

pub(crate) fn convert_usage(usage: MistralUsage) -> ModelUsage {
    ModelUsage {
        input_tokens: usage.prompt_tokens.unwrap_or(0),
        output_tokens: usage.completion_tokens.unwrap_or(0),
        input_tokens_details: None,
        output_tokens_details: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mistral::types::{MistralResponseChoice, MistralToolFunction};

    #[test]
    fn maps_plain_text_choice() {
        let resp = MistralChatResponse {
            id: "cmpl_1".to_string(),
            object: Some("chat.completion".to_string()),
            model: Some("mistral-large-latest".to_string()),
            choices: vec![MistralResponseChoice {
                index: 0,
                message: Some(MistralResponseMessage {
                    role: Some("assistant".to_string()),
                    content: Some(MistralMessageContent::Text("hello".to_string())),
                    tool_calls: None,
                    citations: None,
                }),
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(MistralUsage {
                prompt_tokens: Some(10),
                completion_tokens: Some(5),
                total_tokens: Some(15),
            }),
        };

        let mapped = map_response(resp).unwrap();
        assert_eq!(mapped.content, vec![Part::text("hello")]);
        assert_eq!(mapped.usage.unwrap().output_tokens, 5);
    }

    #[test]
    fn maps_tool_call_choice() {
        let resp = MistralChatResponse {
            id: "cmpl_1".to_string(),
            object: None,
            model: None,
            choices: vec![MistralResponseChoice {
                index: 0,
                message: Some(MistralResponseMessage {
                    role: Some("assistant".to_string()),
                    content: None,
                    tool_calls: Some(vec![MistralToolCallResponse {
                        id: Some("call_1".to_string()),
                        kind: Some("function".to_string()),
                        function: Some(MistralToolFunction {
                            name: Some("search".to_string()),
                            arguments: Some("{\"q\":\"rust\"}".to_string()),
                        }),
                    }]),
                    citations: None,
                }),
                finish_reason: Some("tool_calls".to_string()),
            }],
            usage: None,
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
    fn citation_field_surfaces_not_implemented() {
        let resp = MistralChatResponse {
            id: "cmpl_1".to_string(),
            object: None,
            model: None,
            choices: vec![MistralResponseChoice {
                index: 0,
                message: Some(MistralResponseMessage {
                    role: Some("assistant".to_string()),
                    content: Some(MistralMessageContent::Text("hello".to_string())),
                    tool_calls: None,
                    citations: Some(serde_json::json!([{"source": "doc"}])),
                }),
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        };

        let err = map_response(resp).unwrap_err();
        assert!(matches!(err, LanguageModelError::NotImplemented(_, _)));
    }

    #[test]
    fn moderation_finish_reason_is_refusal() {
        let resp = MistralChatResponse {
            id: "cmpl_1".to_string(),
            object: None,
            model: None,
            choices: vec![MistralResponseChoice {
                index: 0,
                message: Some(MistralResponseMessage {
                    role: Some("assistant".to_string()),
                    content: None,
                    tool_calls: None,
                    citations: None,
                }),
                finish_reason: Some("model_length".to_string()),
            }],
            usage: None,
        };

        // model_length is not a refusal signal, just a length cutoff.
        let mapped = map_response(resp).unwrap();
        assert!(mapped.content.is_empty());
    }
}
