use serde_json::{Map, Value, json};

use crate::error::LanguageModelError;
use crate::part_utils::flatten_source_to_text;
use crate::types::{LanguageModelInput, Message, Part, ResponseFormat, Role, Tool, ToolChoice};

const PROVIDER: &str = "openai.responses";

/// Builds the JSON body for `POST /v1/responses`.
pub(crate) fn build_openai_responses_body(
    input: &LanguageModelInput,
    model: &str,
    stream: bool,
) -> Result<Value, LanguageModelError> {
    let mut body = Map::new();
    body.insert("model".to_string(), json!(model));
    body.insert("input".to_string(), Value::Array(convert_messages(input)?));

    if let Some(system_prompt) = &input.system_prompt {
        body.insert("instructions".to_string(), json!(system_prompt));
    }

    if !input.tools.is_empty() {
        body.insert(
            "tools".to_string(),
            Value::Array(input.tools.iter().map(convert_tool).collect()),
        );
    }

    if let Some(tool_choice) = &input.tool_choice {
        body.insert("tool_choice".to_string(), convert_tool_choice(tool_choice));
    }

    if let Some(response_format) = &input.response_format {
        body.insert("text".to_string(), convert_response_format(response_format));
    }

    if let Some(max_tokens) = input.max_tokens {
        body.insert("max_output_tokens".to_string(), json!(max_tokens));
    }
    if let Some(temperature) = input.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = input.top_p {
        body.insert("top_p".to_string(), json!(top_p));
    }
    if let Some(seed) = input.seed {
        body.insert("seed".to_string(), json!(seed));
    }

    if let Some(reasoning) = &input.reasoning {
        if reasoning.enabled {
            body.insert(
                "reasoning".to_string(),
                json!({ "effort": "medium", "summary": "auto" }),
            );
        }
    }

    if stream {
        body.insert("stream".to_string(), json!(true));
    }

    for (key, value) in &input.extra {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

fn convert_messages(input: &LanguageModelInput) -> Result<Vec<Value>, LanguageModelError> {
    let mut items = Vec::new();
    for message in &input.messages {
        convert_message(message, &mut items)?;
    }
    Ok(items)
}

fn convert_message(message: &Message, items: &mut Vec<Value>) -> Result<(), LanguageModelError> {
    match message.role {
        Role::Tool => {
            for part in &message.content {
                if let Part::ToolResult(result) = part {
                    items.push(json!({
                        "type": "function_call_output",
                        "call_id": result.tool_call_id,
                        "output": tool_result_output(&result.content),
                    }));
                }
            }
        }
        Role::User | Role::Assistant => {
            let is_assistant = matches!(message.role, Role::Assistant);
            let openai_role = if is_assistant { "assistant" } else { "user" };
            let text_kind = if is_assistant { "output_text" } else { "input_text" };

            let mut content = Vec::new();
            for part in &message.content {
                match part {
                    Part::Text(text) => content.push(json!({
                        "type": text_kind,
                        "text": text.text,
                    })),
                    Part::Source(source) => {
                        let flattened = flatten_source_to_text(source);
                        content.push(json!({
                            "type": text_kind,
                            "text": flattened.text,
                        }));
                    }
                    Part::Image(image) => content.push(json!({
                        "type": "input_image",
                        "image_url": format!("data:{};base64,{}", image.mime_type, image.image_data),
                    })),
                    Part::Audio(_) => {
                        return Err(LanguageModelError::unsupported(
                            PROVIDER,
                            "audio input is not supported",
                        ));
                    }
                    Part::Reasoning(reasoning) => {
                        items.push(json!({
                            "type": "reasoning",
                            "summary": [{ "type": "summary_text", "text": reasoning.text }],
                            "encrypted_content": reasoning.signature,
                        }));
                    }
                    Part::ToolCall(call) => {
                        items.push(json!({
                            "type": "function_call",
                            "call_id": call.tool_call_id,
                            "name": call.tool_name,
                            "arguments": call
                                .args
                                .as_ref()
                                .map(|v| v.to_string())
                                .unwrap_or_else(|| "{}".to_string()),
                        }));
                    }
                    Part::ToolResult(_) => {
                        return Err(LanguageModelError::InvalidInput(
                            "tool-result part found outside a tool message".to_string(),
                        ));
                    }
                }
            }

            if !content.is_empty() {
                items.push(json!({
                    "type": "message",
                    "role": openai_role,
                    "content": content,
                }));
            }
        }
    }
    Ok(())
}

fn tool_result_output(content: &[Part]) -> String {
    let mut buffer = String::new();
    for part in content {
        match part {
            Part::Text(text) => buffer.push_str(&text.text),
            Part::Source(source) => buffer.push_str(&flatten_source_to_text(source).text),
            _ => {}
        }
    }
    buffer
}

fn convert_tool(tool: &Tool) -> Value {
    json!({
        "type": "function",
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

fn convert_tool_choice(tool_choice: &ToolChoice) -> Value {
    match tool_choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Tool { tool_name } => json!({ "type": "function", "name": tool_name }),
    }
}

fn convert_response_format(response_format: &ResponseFormat) -> Value {
    match response_format {
        ResponseFormat::Text => json!({ "format": { "type": "text" } }),
        ResponseFormat::Json {
            name,
            schema: Some(schema),
            ..
        } => json!({
            "format": {
                "type": "json_schema",
                "name": name.clone().unwrap_or_else(|| "response".to_string()),
                "schema": schema,
                "strict": true,
            }
        }),
        ResponseFormat::Json { .. } => json!({ "format": { "type": "json_object" } }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Part;

    #[test]
    fn maps_system_prompt_to_instructions() {
        let mut input = LanguageModelInput::new(vec![Message::user(vec![Part::text("hi")])]);
        input.system_prompt = Some("be terse".to_string());
        let body = build_openai_responses_body(&input, "gpt-4.1", false).unwrap();
        assert_eq!(body["instructions"], json!("be terse"));
    }

    #[test]
    fn maps_tool_call_and_result_round_trip() {
        let input = LanguageModelInput::new(vec![
            Message::assistant(vec![Part::tool_call(
                "call_1",
                "lookup",
                Some(json!({"q": "rust"})),
            )]),
            Message::tool(vec![Part::tool_result(
                "call_1",
                "lookup",
                vec![Part::text("42")],
                false,
            )]),
        ]);
        let body = build_openai_responses_body(&input, "gpt-4.1", false).unwrap();
        let items = body["input"].as_array().unwrap();
        assert_eq!(items[0]["type"], json!("function_call"));
        assert_eq!(items[1]["type"], json!("function_call_output"));
        assert_eq!(items[1]["output"], json!("42"));
    }

    #[test]
    fn rejects_audio_input() {
        let input = LanguageModelInput::new(vec![Message::user(vec![Part::Audio(
            crate::types::AudioPart {
                audio_data: "AAA".into(),
                format: crate::types::AudioFormat::Wav,
                sample_rate: None,
                channels: None,
                transcript: None,
                id: None,
            },
        )])]);
        let err = build_openai_responses_body(&input, "gpt-4.1", false).unwrap_err();
        assert!(matches!(err, LanguageModelError::Unsupported(..)));
    }
}
