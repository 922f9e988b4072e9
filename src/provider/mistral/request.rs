use serde_json::{Map, Value, json};

use crate::error::LanguageModelError;
use crate::part_utils::flatten_source_to_text;
use crate::types::{
    LanguageModelInput, Message, Modality, Part, ResponseFormat, Role, ToolChoice, ToolResultPart,
};

const PROVIDER: &str = "mistral";

/// Builds the Mistral Chat Completions request body for `input`.
///
/// Shaped like OpenAI Chat Completions (Mistral's API is a close cousin), but
/// `tool_choice: required` has no Mistral equivalent — Mistral's selector is
/// `"auto" | "none" | "any"`, so [`ToolChoice::Required`] maps to `"any"`.
pub(crate) fn build_request_body(
    input: &LanguageModelInput,
    model: &str,
    stream: bool,
) -> Result<Value, LanguageModelError> {
    if input.modalities.contains(&Modality::Audio) {
        return Err(LanguageModelError::unsupported(
            PROVIDER,
            "audio output is not supported by the Mistral Chat Completions API",
        ));
    }
    if let Some(reasoning) = &input.reasoning {
        if reasoning.enabled {
            return Err(LanguageModelError::not_implemented(
                PROVIDER,
                "reasoning/thinking activation is not wired for the Mistral adapter",
            ));
        }
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
        body.insert("top_p".to_string(), json!(top_p));
    }
    if let Some(presence_penalty) = input.presence_penalty {
        body.insert("presence_penalty".to_string(), json!(presence_penalty));
    }
    if let Some(frequency_penalty) = input.frequency_penalty {
        body.insert("frequency_penalty".to_string(), json!(frequency_penalty));
    }
    if let Some(seed) = input.seed {
        body.insert("random_seed".to_string(), json!(seed));
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

    for (key, value) in &input.extra {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

fn convert_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("any"),
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

/// Converts one normalized [`Message`] into zero or more Mistral wire
/// messages (more than one only for a `tool` message carrying several
/// results, since Mistral ties exactly one `tool_call_id` to each message).
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
        "name": result.tool_name,
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
            "image_url": format!("data:{};base64,{}", image.mime_type, image.image_data),
        })),
        Part::Source(source) => {
            let flattened = flatten_source_to_text(source);
            Ok(json!({"type": "text", "text": flattened.text}))
        }
        Part::Audio(_) => Err(LanguageModelError::unsupported(
            PROVIDER,
            "audio content parts are not supported by the Mistral Chat Completions API",
        )),
        Part::ToolCall(_) | Part::ToolResult(_) | Part::Reasoning(_) => Err(
            LanguageModelError::invariant(PROVIDER, "unexpected part in content conversion"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tool;

    #[test]
    fn system_prompt_becomes_leading_system_message() {
        let mut input = LanguageModelInput::new(vec![Message::user(vec![Part::text("hi")])]);
        input.system_prompt = Some("be terse".to_string());
        let body = build_request_body(&input, "mistral-large-latest", false).unwrap();
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][0]["content"], json!("be terse"));
    }

    #[test]
    fn tool_message_with_multiple_results_expands_to_multiple_messages() {
        let input = LanguageModelInput::new(vec![Message::tool(vec![
            Part::tool_result("call_1", "t", vec![Part::text("one")], false),
            Part::tool_result("call_2", "t", vec![Part::text("two")], false),
        ])]);
        let body = build_request_body(&input, "mistral-large-latest", false).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["tool_call_id"], json!("call_1"));
        assert_eq!(messages[1]["tool_call_id"], json!("call_2"));
    }

    #[test]
    fn required_tool_choice_maps_to_any() {
        let mut input = LanguageModelInput::new(vec![Message::user(vec![Part::text("hi")])]);
        input.tool_choice = Some(ToolChoice::Required);
        let body = build_request_body(&input, "mistral-large-latest", false).unwrap();
        assert_eq!(body["tool_choice"], json!("any"));
    }

    #[test]
    fn assistant_tool_call_is_mapped_to_function_call() {
        let input = LanguageModelInput::new(vec![Message::assistant(vec![Part::tool_call(
            "call_1",
            "search",
            Some(json!({"q": "rust"})),
        )])]);
        let body = build_request_body(&input, "mistral-large-latest", false).unwrap();
        let call = &body["messages"][0]["tool_calls"][0];
        assert_eq!(call["function"]["name"], json!("search"));
    }

    #[test]
    fn json_schema_response_format_is_strict() {
        let mut input = LanguageModelInput::new(vec![Message::user(vec![Part::text("hi")])]);
        input.response_format = Some(ResponseFormat::Json {
            name: Some("recipe".to_string()),
            description: None,
            schema: Some(json!({"type": "object"})),
        });
        let body = build_request_body(&input, "mistral-large-latest", false).unwrap();
        assert_eq!(body["response_format"]["type"], json!("json_schema"));
        assert_eq!(body["response_format"]["json_schema"]["strict"], json!(true));
    }

    #[test]
    fn reasoning_enabled_is_not_implemented() {
        let mut input = LanguageModelInput::new(vec![Message::user(vec![Part::text("hi")])]);
        input.reasoning = Some(crate::types::ReasoningOptions {
            enabled: true,
            budget_tokens: None,
        });
        let err = build_request_body(&input, "mistral-large-latest", false).unwrap_err();
        assert!(matches!(err, LanguageModelError::NotImplemented(_, _)));
    }

    #[test]
    fn rejects_audio_modality_output() {
        let mut input = LanguageModelInput::new(vec![Message::user(vec![Part::text("hi")])]);
        input.modalities = vec![Modality::Audio];
        let err = build_request_body(&input, "mistral-large-latest", false).unwrap_err();
        assert!(matches!(err, LanguageModelError::Unsupported(_, _)));
    }

    #[test]
    fn source_part_is_flattened_to_text_exactly_once() {
        let input = LanguageModelInput::new(vec![Message::user(vec![Part::Source(
            crate::types::SourcePart {
                source: "https://example.com".into(),
                title: "Example".into(),
                content: vec![Part::text("substrate")],
                id: None,
            },
        )])]);
        let body = build_request_body(&input, "mistral-large-latest", false).unwrap();
        let rendered = body.to_string();
        assert_eq!(rendered.matches("substrate").count(), 1);
    }

    #[test]
    fn tool_definitions_pass_through() {
        let mut input = LanguageModelInput::new(vec![Message::user(vec![Part::text("hi")])]);
        input.tools = vec![Tool {
            name: "search".into(),
            description: "search the web".into(),
            parameters: json!({"type": "object"}),
        }];
        let body = build_request_body(&input, "mistral-large-latest", false).unwrap();
        assert_eq!(body["tools"][0]["function"]["name"], json!("search"));
    }
}
