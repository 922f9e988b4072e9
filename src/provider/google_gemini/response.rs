use crate::error::LanguageModelError;
use crate::types::{ModelResponse, ModelTokensDetails, ModelUsage, Part};

use super::types::{GeminiContent, GeminiGenerateContentResponse, GeminiPart, GeminiUsageMetadata};

const PROVIDER: &str = "google_gemini";

const SAFETY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "LANGUAGE",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

pub(crate) fn map_response(
    resp: GeminiGenerateContentResponse,
) -> Result<ModelResponse, LanguageModelError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LanguageModelError::invariant(PROVIDER, "response has no candidates"))?;

    if let Some(reason) = &candidate.finish_reason {
        if SAFETY_FINISH_REASONS.contains(&reason.as_str()) {
            return Err(LanguageModelError::Refusal(
                PROVIDER,
                format!("blocked by safety filter: {reason}"),
            ));
        }
    }

    let content = match candidate.content {
        Some(content) => convert_candidate_content(&content)?,
        None => Vec::new(),
    };

    let usage = resp.usage_metadata.map(convert_usage);

    Ok(ModelResponse {
        content,
        usage,
        cost: None,
    })
}

fn convert_candidate_content(content: &GeminiContent) -> Result<Vec<Part>, LanguageModelError> {
    content.parts.iter().map(convert_part).collect()
}

fn convert_part(part: &GeminiPart) -> Result<Part, LanguageModelError> {
    if let Some(call) = &part.function_call {
        let args = if call.args.is_null() {
            None
        } else {
            Some(call.args.clone())
        };
        // Gemini never assigns a call id; the accumulator and agent loop key
        // on `tool_name` plus positional order for this provider.
        return Ok(Part::tool_call(call.name.clone(), call.name.clone(), args));
    }

    if let Some(response) = &part.function_response {
        return Ok(Part::tool_result(
            response.name.clone(),
            response.name.clone(),
            vec![Part::text(response.response.to_string())],
            false,
        ));
    }

    if part.thought.unwrap_or(false) {
        let text = part.text.clone().unwrap_or_default();
        return Ok(Part::Reasoning(crate::types::ReasoningPart {
            text,
            signature: part.thought_signature.clone(),
            id: None,
        }));
    }

    if let Some(text) = &part.text {
        return Ok(Part::text(text.clone()));
    }

    if let Some(inline) = &part.inline_data {
        if inline.mime_type.starts_with("image/") {
            return Ok(Part::Image(crate::types::ImagePart {
                image_data: inline.data.clone(),
                mime_type: inline.mime_type.clone(),
                width: None,
                height: None,
                id: None,
            }));
        }
        if let Some(format) = crate::part_utils::mime_to_audio_format(&inline.mime_type) {
            return Ok(Part::Audio(crate::types::AudioPart {
                audio_data: inline.data.clone(),
                format,
                sample_rate: None,
                channels: None,
                transcript: None,
                id: None,
            }));
        }
    }

    Err(LanguageModelError::invariant(
        PROVIDER,
        "candidate part has no recognized content",
    ))
}

pub(crate) fn convert_usage(usage: GeminiUsageMetadata) -> ModelUsage {
    let input_tokens_details = ModelTokensDetails {
        text_tokens: Some(
            usage
                .prompt_token_count
                .saturating_sub(usage.cached_content_token_count),
        ),
        cached_text_tokens: Some(usage.cached_content_token_count),
        ..Default::default()
    };
    let output_tokens_details = ModelTokensDetails {
        text_tokens: Some(
            usage
                .candidates_token_count
                .saturating_sub(usage.thoughts_token_count),
        ),
        ..Default::default()
    };

    ModelUsage {
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
        input_tokens_details: Some(input_tokens_details),
        output_tokens_details: Some(output_tokens_details),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::GeminiCandidate;

    #[test]
    fn maps_basic_text_response() {
        let resp = GeminiGenerateContentResponse {
            candidates: vec![GeminiCandidate {
                content: Some(GeminiContent {
                    parts: vec![GeminiPart {
                        text: Some("hello".to_string()),
                        ..Default::default()
                    }],
                    role: Some("model".to_string()),
                }),
                finish_reason: Some("STOP".to_string()),
                index: Some(0),
            }],
            usage_metadata: Some(GeminiUsageMetadata {
                prompt_token_count: 4,
                cached_content_token_count: 0,
                candidates_token_count: 7,
                thoughts_token_count: 0,
            }),
            model_version: Some("gemini-2.0-flash".to_string()),
            response_id: Some("resp-1".to_string()),
            extra: Default::default(),
        };

        let mapped = map_response(resp).unwrap();
        assert_eq!(mapped.content, vec![Part::text("hello")]);
        let usage = mapped.usage.unwrap();
        assert_eq!(usage.input_tokens, 4);
        assert_eq!(usage.output_tokens, 7);
    }

    #[test]
    fn function_call_part_maps_to_tool_call() {
        let resp = GeminiGenerateContentResponse {
            candidates: vec![GeminiCandidate {
                content: Some(GeminiContent {
                    parts: vec![GeminiPart {
                        function_call: Some(super::super::types::GeminiFunctionCall {
                            name: "get_weather".to_string(),
                            args: serde_json::json!({"city": "nyc"}),
                        }),
                        ..Default::default()
                    }],
                    role: Some("model".to_string()),
                }),
                finish_reason: Some("STOP".to_string()),
                index: Some(0),
            }],
            usage_metadata: None,
            model_version: None,
            response_id: None,
            extra: Default::default(),
        };

        let mapped = map_response(resp).unwrap();
        match &mapped.content[0] {
            Part::ToolCall(call) => assert_eq!(call.tool_name, "get_weather"),
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn safety_finish_reason_is_refusal() {
        let resp = GeminiGenerateContentResponse {
            candidates: vec![GeminiCandidate {
                content: None,
                finish_reason: Some("SAFETY".to_string()),
                index: Some(0),
            }],
            usage_metadata: None,
            model_version: None,
            response_id: None,
            extra: Default::default(),
        };

        let err = map_response(resp).unwrap_err();
        assert!(matches!(err, LanguageModelError::Refusal(_, _)));
    }
}
