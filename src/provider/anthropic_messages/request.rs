use serde_json::{Map, Value, json};

use crate::error::LanguageModelError;
use crate::part_utils::flatten_source_to_text;
use crate::types::{
    LanguageModelInput, Message, Modality, Part, ResponseFormat, Role, ToolChoice,
};

const PROVIDER: &str = "anthropic_messages";
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Synthetic tool name used to coerce structured JSON output (§4.2
/// response-format rule) since Anthropic has no native strict JSON mode.
pub(crate) const STRUCTURED_OUTPUT_TOOL: &str = "__structured_output__";

/// Builds the Anthropic Messages request body for `input`.
pub(crate) fn build_request_body(
    input: &LanguageModelInput,
    model: &str,
    stream: bool,
) -> Result<Value, LanguageModelError> {
    if input.modalities.contains(&Modality::Audio) {
        return Err(LanguageModelError::unsupported(
            PROVIDER,
            "audio output is not supported by the Anthropic Messages API",
        ));
    }

    let mut body = Map::new();
    body.insert("model".to_string(), json!(model));
    body.insert("stream".to_string(), json!(stream));

    if let Some(system) = &input.system_prompt {
        if !system.is_empty() {
            body.insert("system".to_string(), json!(system));
        }
    }

    let messages = input
        .messages
        .iter()
        .map(convert_message)
        .collect::<Result<Vec<_>, _>>()?;
    body.insert("messages".to_string(), Value::Array(messages));

    body.insert(
        "max_tokens".to_string(),
        json!(input.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    );
    if let Some(temperature) = input.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = input.top_p {
        body.insert("top_p".to_string(), json!(top_p));
    }
    if let Some(top_k) = input.top_k {
        body.insert("top_k".to_string(), json!(top_k));
    }

    if let Some(reasoning) = &input.reasoning {
        if reasoning.enabled {
            let mut thinking = Map::new();
            thinking.insert("type".to_string(), json!("enabled"));
            thinking.insert(
                "budget_tokens".to_string(),
                json!(reasoning.budget_tokens.unwrap_or(1024)),
            );
            body.insert("thinking".to_string(), Value::Object(thinking));
        }
    }

    let mut tools = input
        .tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.parameters,
            })
        })
        .collect::<Vec<_>>();

    let mut forced_tool_choice = None;
    if let Some(ResponseFormat::Json { schema: Some(schema), name, .. }) = &input.response_format {
        tools.push(json!({
            "name": STRUCTURED_OUTPUT_TOOL,
            "description": name.clone().unwrap_or_else(|| "Return the requested structured output.".to_string()),
            "input_schema": schema,
        }));
        forced_tool_choice = Some(json!({"type": "tool", "name": STRUCTURED_OUTPUT_TOOL}));
    }

    if !tools.is_empty() {
        body.insert("tools".to_string(), Value::Array(tools));
    }

    if let Some(choice) = forced_tool_choice {
        body.insert("tool_choice".to_string(), choice);
    } else if let Some(choice) = &input.tool_choice {
        if let Some(value) = convert_tool_choice(choice) {
            body.insert("tool_choice".to_string(), value);
        }
    }

    for (key, value) in &input.extra {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

fn convert_tool_choice(choice: &ToolChoice) -> Option<Value> {
    match choice {
        ToolChoice::Auto => Some(json!({"type": "auto"})),
        ToolChoice::Required => Some(json!({"type": "any"})),
        ToolChoice::Tool { tool_name } => Some(json!({"type": "tool", "name": tool_name})),
        // Anthropic has no explicit "no tools" selector; the caller is
        // expected to omit `tools` entirely to achieve the same effect.
        ToolChoice::None => None,
    }
}

fn convert_message(message: &Message) -> Result<Value, LanguageModelError> {
    let role = match message.role {
        Role::Assistant => "assistant",
        Role::User | Role::Tool => "user",
    };

    let mut blocks = Vec::with_capacity(message.content.len());
    for part in &message.content {
        blocks.push(convert_part(part)?);
    }

    Ok(json!({"role": role, "content": blocks}))
}

fn convert_part(part: &Part) -> Result<Value, LanguageModelError> {
    match part {
        Part::Text(text) => Ok(json!({"type": "text", "text": text.text})),
        Part::Image(image) => Ok(json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": image.mime_type,
                "data": image.image_data,
            }
        })),
        Part::Reasoning(reasoning) => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!("thinking"));
            obj.insert("thinking".to_string(), json!(reasoning.text));
            if let Some(signature) = &reasoning.signature {
                obj.insert("signature".to_string(), json!(signature));
            }
            Ok(Value::Object(obj))
        }
        Part::Source(source) => {
            let flattened = flatten_source_to_text(source);
            Ok(json!({"type": "text", "text": flattened.text}))
        }
        Part::ToolCall(call) => Ok(json!({
            "type": "tool_use",
            "id": call.tool_call_id,
            "name": call.tool_name,
            "input": call.args.clone().unwrap_or(Value::Null),
        })),
        Part::ToolResult(result) => {
            let content = result
                .content
                .iter()
                .map(convert_part)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(json!({
                "type": "tool_result",
                "tool_use_id": result.tool_call_id,
                "content": content,
                "is_error": result.is_error.unwrap_or(false),
            }))
        }
        Part::Audio(_) => Err(LanguageModelError::unsupported(
            PROVIDER,
            "audio content parts are not supported by the Anthropic Messages API",
        )),
    }
}
