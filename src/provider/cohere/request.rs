use serde_json::{Map, Value, json};

use crate::error::LanguageModelError;
use crate::part_utils::flatten_source_to_text;
use crate::types::{
    LanguageModelInput, Message, Modality, Part, ResponseFormat, Role, ToolChoice, ToolResultPart,
};

const PROVIDER: &str = "cohere";

/// Builds the Cohere `/v2/chat` request body for `input`.
///
/// Like Chat Completions, a single normalized tool message carrying several
/// [`ToolResultPart`]s expands into one Cohere `"tool"` message per result
/// (Cohere ties exactly one `tool_call_id` to each such message).
pub(crate) fn build_request_body(
    input: &LanguageModelInput,
    model: &str,
    stream: bool,
) -> Result<Value, LanguageModelError> {
    if input.modalities.contains(&Modality::Audio) || input.modalities.contains(&Modality::Image) {
        return Err(LanguageModelError::unsupported(
            PROVIDER,
            "audio/image output is not supported by the Cohere Chat API",
        ));
    }

    let mut body = Map::new();
    body.insert("model".to_string(), json!(model));
    body.insert("stream".to_string(), json!(stream));

    let mut messages = Vec::new();
    if let Some(system) = &input.system_prompt {
        if !system.is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
    }
    for message in &input.messages {
        messages.extend(convert_message(message)?);
    }
    body.insert("messages".to_string(), Value::Array(messages));

    if let Some(max_tokens) = input.max_tokens {
        body.insert("max_tokens".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = input.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = input.top_p {
        body.insert("p".to_string(), json!(top_p));
    }
    if let Some(top_k) = input.top_k {
        body.insert("k".to_string(), json!(top_k));
    }
    if let Some(presence_penalty) = input.presence_penalty {
        body.insert("presence_penalty".to_string(), json!(presence_penalty));
    }
    if let Some(frequency_penalty) = input.frequency_penalty {
        body.insert("frequency_penalty".to_string(), json!(frequency_penalty));
    }
    if let Some(seed) = input.seed {
        body.insert("seed".to_string(), json!(seed));
    }

    if !input.tools.is_empty() {
        let tools = input
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect::<Vec<_>>();
        body.insert("tools".to_string(), Value::Array(tools));
    }
    if let Some(choice) = &input.tool_choice {
        if let Some(value) = convert_tool_choice(choice) {
            body.insert("tool_choice".to_string(), value);
        }
    }

    if let Some(format) = &input.response_format {
        body.insert("response_format".to_string(), convert_response_format(format));
    }

    for (key, value) in &input.extra {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

/// Cohere's tool_choice is `"REQUIRED" | "NONE"`, with no native "force a
/// specific named tool" selector; `Tool { .. }` falls back to `REQUIRED` and
/// relies on there being exactly one tool offered (the agent layer is
/// responsible for narrowing `tools` when a caller truly needs one specific
/// tool forced).
fn convert_tool_choice(choice: &ToolChoice) -> Option<Value> {
    match choice {
        ToolChoice::Auto => None,
        ToolChoice::Required | ToolChoice::Tool { .. } => Some(json!("REQUIRED")),
        ToolChoice::None => Some(json!("NONE")),
    }
}

fn convert_response_format(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::Text => json!({"type": "text"}),
        ResponseFormat::Json {
            schema: Some(schema),
            ..
        } => json!({"type": "json_object", "json_schema": schema}),
        ResponseFormat::Json { .. } => json!({"type": "json_object"}),
    }
}

/// Converts one normalized [`Message`] into zero or more Cohere wire
/// messages (more than one only for a `tool` message carrying several
/// results).
fn convert_message(message: &Message) -> Result<Vec<Value>, LanguageModelError> {
    match message.role {
        Role::Tool => message
            .content
            .iter()
            .map(|part| match part {
                Part::ToolResult(result) => Ok(convert_tool_result(result)),
                other => Err(LanguageModelError::invariant(
                    PROVIDER,
                    format!("tool message contains non-tool-result part {other:?}"),
                )),
            })
            .collect(),
        Role::User | Role::Assistant => Ok(vec![convert_turn_message(message)?]),
    }
}

fn convert_tool_result(result: &ToolResultPart) -> Value {
    let content = result
        .content
        .iter()
        .filter_map(|part| match part {
            Part::Text(text) => Some(text.text.clone()),
            Part::Source(source) => Some(flatten_source_to_text(source).text),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    json!({
        "role": "tool",
        "tool_call_id": result.tool_call_id,
        "content": content,
    })
}

fn convert_turn_message(message: &Message) -> Result<Value, LanguageModelError> {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => unreachable!("tool messages are handled by convert_message"),
    };

    let mut text_segments = Vec::new();
    let mut tool_calls = Vec::new();

    for part in &message.content {
        match part {
            Part::Text(text) => text_segments.push(text.text.clone()),
            Part::Source(source) => text_segments.push(flatten_source_to_text(source).text),
            Part::ToolCall(call) => {
                let arguments = call
                    .args
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "{}".to_string());
                tool_calls.push(json!({
                    "id": call.tool_call_id,
                    "type": "function",
                    "function": { "name": call.tool_name, "arguments": arguments },
                }));
            }
            // Cohere's message history has no surface to replay reasoning
            // content back in; it is dropped on the way out.
            Part::Reasoning(_) => {}
            Part::Image(_) | Part::Audio(_) => {
                return Err(LanguageModelError::unsupported(
                    PROVIDER,
                    "image/audio content parts are not supported by the Cohere Chat API",
                ));
            }
            Part::ToolResult(_) => {
                return Err(LanguageModelError::invariant(
                    PROVIDER,
                    "tool-result part in a non-tool message",
                ));
            }
        }
    }

    let mut obj = Map::new();
    obj.insert("role".to_string(), json!(role));
    obj.insert("content".to_string(), json!(text_segments.join("\n")));
    if !tool_calls.is_empty() {
        obj.insert("tool_calls".to_string(), Value::Array(tool_calls));
    }
    Ok(Value::Object(obj))
}
