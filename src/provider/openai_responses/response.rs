use crate::error::LanguageModelError;
use crate::types::{ModelResponse, ModelTokensDetails, ModelUsage, Part};

use super::types::{OpenAiResponsesResponse, ResponsesOutputItem, ResponsesUsage};

const PROVIDER: &str = "openai.responses";

pub(crate) fn map_responses_response(
    resp: OpenAiResponsesResponse,
) -> Result<ModelResponse, LanguageModelError> {
    let mut content = Vec::new();
    for item in &resp.output {
        convert_output_item(item, &mut content)?;
    }

    let usage = resp.usage.map(convert_usage);

    Ok(ModelResponse {
        content,
        usage,
        cost: None,
    })
}

fn convert_output_item(
    item: &ResponsesOutputItem,
    content: &mut Vec<Part>,
) -> Result<(), LanguageModelError> {
    match item.kind.as_str() {
        "message" => {
            for block in &item.content {
                match block.kind.as_str() {
                    "output_text" => {
                        if let Some(text) = &block.text {
                            content.push(Part::text(text.clone()));
                        }
                    }
                    "refusal" => {
                        if let Some(refusal) = &block.refusal {
                            return Err(LanguageModelError::Refusal(PROVIDER, refusal.clone()));
                        }
                    }
                    _ => {}
                }
            }
        }
        "function_call" => {
            let call_id = item.call_id.clone().unwrap_or_default();
            let name = item.name.clone().unwrap_or_default();
            let args = item
                .arguments
                .as_ref()
                .filter(|raw| !raw.trim().is_empty())
                .and_then(|raw| serde_json::from_str(raw).ok());
            content.push(Part::tool_call(call_id, name, args));
        }
        "reasoning" => {
            let text = item
                .summary
                .iter()
                .filter_map(|block| block.text.clone())
                .collect::<Vec<_>>()
                .join("\n");
            content.push(Part::Reasoning(crate::types::ReasoningPart {
                text,
                signature: item.encrypted_content.clone(),
                id: item.id.clone(),
            }));
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn convert_usage(usage: ResponsesUsage) -> ModelUsage {
    let input_tokens_details = usage.input_tokens_details.map(|details| ModelTokensDetails {
        cached_text_tokens: Some(details.cached_tokens),
        text_tokens: Some(usage.input_tokens.saturating_sub(details.cached_tokens)),
        ..Default::default()
    });

    let output_tokens_details = usage.output_tokens_details.map(|details| ModelTokensDetails {
        text_tokens: Some(usage.output_tokens.saturating_sub(details.reasoning_tokens)),
        ..Default::default()
    });

    ModelUsage {
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        input_tokens_details,
        output_tokens_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::openai_responses::types::{ResponsesContentBlock, ResponsesInputTokensDetails};

    #[test]
    fn maps_text_message_output() {
        let resp = OpenAiResponsesResponse {
            status: Some("completed".to_string()),
            output: vec![ResponsesOutputItem {
                kind: "message".to_string(),
                id: Some("msg_1".to_string()),
                content: vec![ResponsesContentBlock {
                    kind: "output_text".to_string(),
                    text: Some("hello".to_string()),
                    annotations: vec![],
                    refusal: None,
                }],
                call_id: None,
                name: None,
                arguments: None,
                summary: vec![],
                encrypted_content: None,
            }],
            usage: Some(ResponsesUsage {
                input_tokens: 10,
                output_tokens: 5,
                input_tokens_details: Some(ResponsesInputTokensDetails { cached_tokens: 2 }),
                output_tokens_details: None,
            }),
            extra: Default::default(),
        };

        let mapped = map_responses_response(resp).unwrap();
        assert_eq!(mapped.content, vec![Part::text("hello")]);
        let usage = mapped.usage.unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(
            usage.input_tokens_details.unwrap().cached_text_tokens,
            Some(2)
        );
    }

    #[test]
    fn maps_function_call_output() {
        let resp = OpenAiResponsesResponse {
            status: Some("completed".to_string()),
            output: vec![ResponsesOutputItem {
                kind: "function_call".to_string(),
                id: Some("fc_1".to_string()),
                content: vec![],
                call_id: Some("call_1".to_string()),
                name: Some("get_weather".to_string()),
                arguments: Some("{\"city\":\"nyc\"}".to_string()),
                summary: vec![],
                encrypted_content: None,
            }],
            usage: None,
            extra: Default::default(),
        };

        let mapped = map_responses_response(resp).unwrap();
        match &mapped.content[0] {
            Part::ToolCall(call) => {
                assert_eq!(call.tool_call_id, "call_1");
                assert_eq!(call.tool_name, "get_weather");
                assert_eq!(call.args, Some(serde_json::json!({"city": "nyc"})));
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }
}
