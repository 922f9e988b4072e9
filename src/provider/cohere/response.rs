use crate::error::LanguageModelError;
use crate::types::{ModelResponse, ModelUsage, Part, SourcePart, TextPart, ToolCallPart};

use super::error::check_refusal;
use super::types::{CohereChatResponse, CohereCitation, CohereContentBlock, CohereToolCall, CohereUsage};

/// Maps a non-streaming Cohere `/v2/chat` response to a [`ModelResponse`].
pub(crate) fn map_response(resp: CohereChatResponse) -> Result<ModelResponse, LanguageModelError> {
    check_refusal(resp.finish_reason.as_deref())?;

    let mut content = Vec::new();
    for block in &resp.message.content {
        if let Some(part) = convert_block(block) {
            content.push(part);
        }
    }
    for call in resp.message.tool_calls.unwrap_or_default() {
        content.push(convert_tool_call(call)?);
    }
    for citation in resp.message.citations.unwrap_or_default() {
        content.push(convert_citation(citation));
    }

    Ok(ModelResponse {
        content,
        usage: resp.usage.as_ref().map(convert_usage),
        cost: None,
    })
}

fn convert_block(block: &CohereContentBlock) -> Option<Part> {
    match block.kind.as_str() {
        "text" => Some(Part::Text(TextPart {
            text: block.text.clone().unwrap_or_default(),
            id: None,
        })),
        "thinking" => Some(Part::Reasoning(crate::types::ReasoningPart {
            text: block.thinking.clone().unwrap_or_default(),
            signature: None,
            id: None,
        })),
        _ => None,
    }
}

fn convert_tool_call(call: CohereToolCall) -> Result<Part, LanguageModelError> {
    let arguments = call.function.arguments.as_deref().unwrap_or("{}");
    let args = serde_json::from_str(arguments).map_err(|err| {
        LanguageModelError::invariant(
            "cohere",
            format!("tool call arguments are not valid JSON: {err}"),
        )
    })?;
    Ok(Part::ToolCall(ToolCallPart {
        tool_call_id: call.id,
        tool_name: call.function.name.unwrap_or_default(),
        args: Some(args),
        id: None,
    }))
}

/// Maps a grounding [`CohereCitation`] onto the normalized [`SourcePart`]
/// citation substrate (§3.1); the cited span becomes the source's text
/// content and each backing document becomes part of its title/source pair.
fn convert_citation(citation: CohereCitation) -> Part {
    let source = citation
        .sources
        .first()
        .and_then(|s| s.id.clone())
        .unwrap_or_default();
    let title = citation
        .sources
        .first()
        .and_then(|s| s.document.as_ref())
        .and_then(|doc| doc.get("title"))
        .and_then(|v| v.as_str())
        .unwrap_or("citation")
        .to_string();

    Part::Source(SourcePart {
        source,
        title,
        content: vec![Part::text(citation.text.unwrap_or_default())],
        id: None,
    })
}

pub(crate) fn convert_usage(usage: &CohereUsage) -> ModelUsage {
    let counts = usage
        .billed_units
        .clone()
        .or_else(|| usage.tokens.clone())
        .unwrap_or_default();
    ModelUsage {
        input_tokens: counts.input_tokens.unwrap_or(0.0).round() as u64,
        output_tokens: counts.output_tokens.unwrap_or(0.0).round() as u64,
        input_tokens_details: None,
        output_tokens_details: None,
    }
}
