use serde_json::{Map, Value, json};

use crate::error::LanguageModelError;
use crate::part_utils::{audio_format_to_mime, flatten_source_to_text};
use crate::types::{LanguageModelInput, Message, Part, ResponseFormat, Role, Tool, ToolChoice};

const PROVIDER: &str = "google_gemini";

/// Builds a Google Gemini GenerateContent request body.
///
/// Unlike OpenAI, Gemini encodes the model in the path
/// (`POST /v1beta/models/{model}:generateContent`), so `model` does not
/// appear in the JSON body.
pub(crate) fn build_gemini_body(
    input: &LanguageModelInput,
    _model: &str,
) -> Result<Value, LanguageModelError> {
    let mut body = Map::new();

    if let Some(system_prompt) = &input.system_prompt {
        if !system_prompt.is_empty() {
            body.insert(
                "system_instruction".to_string(),
                json!({ "parts": [ { "text": system_prompt } ] }),
            );
        }
    }

    let contents = input
        .messages
        .iter()
        .map(convert_message)
        .collect::<Result<Vec<_>, _>>()?;
    if contents.is_empty() {
        return Err(LanguageModelError::invariant(
            PROVIDER,
            "Gemini GenerateContent request requires at least one message",
        ));
    }
    body.insert("contents".to_string(), Value::Array(contents));

    if let Some(config) = build_generation_config(input)? {
        body.insert("generationConfig".to_string(), config);
    }

    if !input.tools.is_empty() {
        body.insert("tools".to_string(), json!([convert_tools(&input.tools)]));
    }
    if let Some(choice) = &input.tool_choice {
        if let Some(config) = convert_tool_choice(choice) {
            body.insert("toolConfig".to_string(), config);
        }
    }

    for (key, value) in &input.extra {
        body.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(body))
}

/// Converts a unified [`Message`] into a Gemini `Content` object.
///
/// Tool results have no dedicated Gemini role; Google documents them as
/// `role: "function"` carrying one `functionResponse` part per result.
fn convert_message(message: &Message) -> Result<Value, LanguageModelError> {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "model",
        Role::Tool => "function",
    };

    let parts = message
        .content
        .iter()
        .map(convert_part)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "role": role, "parts": parts }))
}

fn convert_part(part: &Part) -> Result<Value, LanguageModelError> {
    match part {
        Part::Text(text) => Ok(json!({ "text": text.text })),
        Part::Image(image) => Ok(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": image.image_data,
            }
        })),
        Part::Audio(audio) => Ok(json!({
            "inlineData": {
                "mimeType": audio_format_to_mime(audio.format),
                "data": audio.audio_data,
            }
        })),
        Part::Source(source) => {
            let flattened = flatten_source_to_text(source);
            Ok(json!({ "text": flattened.text }))
        }
        Part::ToolCall(call) => Ok(json!({
            "functionCall": {
                "name": call.tool_name,
                "args": call.args.clone().unwrap_or(Value::Null),
            }
        })),
        Part::ToolResult(result) => {
            let response_text = result
                .content
                .iter()
                .filter_map(|part| match part {
                    Part::Text(text) => Some(text.text.clone()),
                    Part::Source(source) => Some(flatten_source_to_text(source).text),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(json!({
                "functionResponse": {
                    "name": result.tool_name,
                    "response": { "content": response_text },
                }
            }))
        }
        Part::Reasoning(_) => Err(LanguageModelError::invariant(
            PROVIDER,
            "reasoning parts cannot be replayed back into a Gemini request",
        )),
    }
}

fn build_generation_config(input: &LanguageModelInput) -> Result<Option<Value>, LanguageModelError> {
    let mut config = Map::new();

    if let Some(temperature) = input.temperature {
        config.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(top_p) = input.top_p {
        config.insert("topP".to_string(), json!(top_p));
    }
    if let Some(top_k) = input.top_k {
        config.insert("topK".to_string(), json!(top_k));
    }
    if let Some(max_tokens) = input.max_tokens {
        config.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }
    if let Some(penalty) = input.presence_penalty {
        config.insert("presencePenalty".to_string(), json!(penalty));
    }
    if let Some(penalty) = input.frequency_penalty {
        config.insert("frequencyPenalty".to_string(), json!(penalty));
    }
    if let Some(seed) = input.seed {
        config.insert("seed".to_string(), json!(seed));
    }
    if let Some(reasoning) = &input.reasoning {
        if reasoning.enabled {
            let mut thinking = Map::new();
            thinking.insert("includeThoughts".to_string(), json!(true));
            if let Some(budget) = reasoning.budget_tokens {
                thinking.insert("thinkingBudget".to_string(), json!(budget));
            }
            config.insert("thinkingConfig".to_string(), Value::Object(thinking));
        }
    }

    match &input.response_format {
        None | Some(ResponseFormat::Text) => {}
        Some(ResponseFormat::Json { schema: Some(schema), .. }) => {
            config.insert(
                "responseMimeType".to_string(),
                Value::String("application/json".to_string()),
            );
            config.insert("responseSchema".to_string(), schema.clone());
        }
        Some(ResponseFormat::Json { .. }) => {
            config.insert(
                "responseMimeType".to_string(),
                Value::String("application/json".to_string()),
            );
        }
    }

    if config.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Object(config)))
    }
}

fn convert_tools(tools: &[Tool]) -> Value {
    let declarations = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            })
        })
        .collect::<Vec<_>>();
    json!({ "functionDeclarations": declarations })
}

fn convert_tool_choice(choice: &ToolChoice) -> Option<Value> {
    match choice {
        ToolChoice::Auto => None,
        ToolChoice::Required => Some(json!({ "functionCallingConfig": { "mode": "ANY" } })),
        ToolChoice::None => Some(json!({ "functionCallingConfig": { "mode": "NONE" } })),
        ToolChoice::Tool { tool_name } => Some(json!({
            "functionCallingConfig": {
                "mode": "ANY",
                "allowedFunctionNames": [tool_name],
            }
        })),
    }
}
