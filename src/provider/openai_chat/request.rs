use serde_json::{Map, Value, json};

use crate::error::LanguageModelError;
use crate::part_utils::flatten_source_to_text;
use crate::types::{
    AudioFormat, LanguageModelInput, Message, Part, ResponseFormat, Role, ToolChoice,
    ToolResultPart,
};

const PROVIDER: &str = "openai_chat";

/// Builds the OpenAI Chat Completions request body for `input`.
///
/// A single normalized [`Message`] with `role: tool` and several
/// [`ToolResultPart`]s expands into one OpenAI `"tool"` message per result,
/// since Chat Completions ties exactly one `tool_call_id` to each such
/// message.
pub(crate) fn build_request_body(
    input: &LanguageModelInput,
    model: &str,
    stream: bool,
) -> Result<Value, LanguageModelError> {
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
        body.insert("max_completion_tokens".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = input.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = input.top_p {
        body.insert("top_p".to_string(), json!(top_p));
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
        body.insert("tool_choice".to_string(), convert_tool_choice(choice));
    }

    if let Some(format) = &input.response_format {
        body.insert("response_format".to_string(), convert_response_format(format));
    }

    if let Some(reasoning) = &input.reasoning {
        if reasoning.enabled {
            body.insert("reasoning_effort".to_string(), json!("medium"));
        }
    }

    for (key, value) in &input.extra {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

fn convert_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Tool { tool_name } => json!({
            "type": "function",
            "function": { "name": tool_name },
        }),
    }
}

fn convert_response_format(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::Text => json!({"type": "text"}),
        ResponseFormat::Json {
            name,
            schema: Some(schema),
            ..
        } => json!({
            "type": "json_schema",
            "json_schema": {
                "name": name.clone().unwrap_or_else(|| "response".to_string()),
                "schema": schema,
                "strict": true,
            }
        }),
        ResponseFormat::Json { .. } => json!({"type": "json_object"}),
    }
}

/// Converts one normalized [`Message`] into zero or more OpenAI wire
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

    let mut content_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for part in &message.content {
        match part {
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
            // Chat Completions has no mechanism to replay reasoning content
            // back into a conversation; it is dropped on the way out.
            Part::Reasoning(_) => {}
            other => content_parts.push(convert_content_part(other)?),
        }
    }

    let mut obj = Map::new();
    obj.insert("role".to_string(), json!(role));
    obj.insert(
        "content".to_string(),
        if content_parts.is_empty() {
            Value::Null
        } else {
            Value::Array(content_parts)
        },
    );
    if !tool_calls.is_empty() {
        obj.insert("tool_calls".to_string(), Value::Array(tool_calls));
    }
    Ok(Value::Object(obj))
}

fn convert_content_part(part: &Part) -> Result<Value, LanguageModelError> {
    match part {
        Part::Text(text) => Ok(json!({"type": "text", "text": text.text})),
        Part::Image(image) => Ok(json!({
            "type": "image_url",
            "image_url": {
                "url": format!("data:{};base64,{}", image.mime_type, image.image_data),
            }
        })),
        Part::Audio(audio) => Ok(json!({
            "type": "input_audio",
            "input_audio": {
                "data": audio.audio_data,
                "format": openai_audio_format(audio.format),
            }
        })),
        Part::Source(source) => {
            let flattened = flatten_source_to_text(source);
            Ok(json!({"type": "text", "text": flattened.text}))
        }
        Part::ToolCall(_) | Part::ToolResult(_) | Part::Reasoning(_) => Err(
            LanguageModelError::invariant(PROVIDER, "unexpected part in content conversion"),
        ),
    }
}
