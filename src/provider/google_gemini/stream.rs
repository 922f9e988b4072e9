use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LanguageModelError;
use crate::http::HttpBodyStream;
use crate::part_utils::guess_delta_index;
use crate::types::{ContentDelta, PartDelta, PartialModelResponse, ReasoningPartDelta, TextPartDelta, ToolCallPartDelta};

use super::response::convert_usage;
use super::types::GeminiGenerateContentResponse;

const PROVIDER: &str = "google_gemini";

/// Adapts a Gemini `streamGenerateContent` SSE body into the normalized
/// [`PartialModelResponse`] stream.
///
/// Gemini re-sends the full `parts` array of the active candidate on every
/// chunk rather than keying deltas by a stable index, so this adapter relies
/// on [`guess_delta_index`] the same way the OpenAI Chat Completions adapter
/// does, just without any native index to seed it with.
pub(crate) fn decode_stream(
    body: HttpBodyStream,
) -> impl Stream<Item = Result<PartialModelResponse, LanguageModelError>> + Send {
    let decoder = crate::stream::StreamDecoder::new(body, PROVIDER);
    let mut seen: Vec<ContentDelta> = Vec::new();

    decoder.flat_map(move |event| {
        let frames = match event {
            Ok(crate::stream::StreamEvent::Done) => Vec::new(),
            Ok(crate::stream::StreamEvent::Data(data)) => {
                match serde_json::from_str::<GeminiGenerateContentResponse>(&data) {
                    Ok(parsed) => handle_chunk(parsed, &mut seen),
                    Err(err) => vec![Err(LanguageModelError::invariant(
                        PROVIDER,
                        format!("failed to decode stream chunk: {err}"),
                    ))],
                }
            }
            Err(err) => vec![Err(err)],
        };
        futures_util::stream::iter(frames)
    })
}

fn handle_chunk(
    chunk: GeminiGenerateContentResponse,
    seen: &mut Vec<ContentDelta>,
) -> Vec<Result<PartialModelResponse, LanguageModelError>> {
    let mut frames = Vec::new();

    let candidate = chunk.candidates.into_iter().next();
    if let Some(candidate) = candidate {
        if let Some(content) = candidate.content {
            for part in content.parts {
                if let Some(call) = part.function_call {
                    let args_str = serde_json::to_string(&call.args).ok();
                    let delta_part = PartDelta::ToolCall(ToolCallPartDelta {
                        tool_call_id: Some(call.name.clone()),
                        tool_name: Some(call.name),
                        args: args_str,
                        id: None,
                    });
                    let index = guess_delta_index(&delta_part, seen, None);
                    let content_delta = ContentDelta { index, part: delta_part };
                    seen.push(content_delta.clone());
                    frames.push(Ok(PartialModelResponse {
                        delta: Some(content_delta),
                        usage: None,
                        cost: None,
                    }));
                    continue;
                }

                if part.thought.unwrap_or(false) {
                    let delta_part = PartDelta::Reasoning(ReasoningPartDelta {
                        text: part.text.unwrap_or_default(),
                        signature: part.thought_signature,
                        id: None,
                    });
                    let index = guess_delta_index(&delta_part, seen, None);
                    let content_delta = ContentDelta { index, part: delta_part };
                    seen.push(content_delta.clone());
                    frames.push(Ok(PartialModelResponse {
                        delta: Some(content_delta),
                        usage: None,
                        cost: None,
                    }));
                    continue;
                }

                if let Some(text) = part.text {
                    if !text.is_empty() {
                        let delta_part = PartDelta::Text(TextPartDelta { text, id: None });
                        let index = guess_delta_index(&delta_part, seen, None);
                        let content_delta = ContentDelta { index, part: delta_part };
                        seen.push(content_delta.clone());
                        frames.push(Ok(PartialModelResponse {
                            delta: Some(content_delta),
                            usage: None,
                            cost: None,
                        }));
                    }
                }
            }
        }
    }

    if let Some(usage) = chunk.usage_metadata {
        frames.push(Ok(PartialModelResponse {
            delta: None,
            usage: Some(convert_usage(usage)),
            cost: None,
        }));
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(lines: Vec<&str>) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, LanguageModelError>> = lines
            .into_iter()
            .map(|line| Ok(format!("data: {line}\n\n").into_bytes()))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn text_deltas_share_one_index() {
        let lines = vec![
            r#"{"candidates":[{"content":{"parts":[{"text":"hel"}],"role":"model"}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"lo"}],"role":"model"}}]}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first.delta.as_ref().unwrap().index, 0);
        assert_eq!(second.delta.as_ref().unwrap().index, 0);
    }

    #[tokio::test]
    async fn function_call_delta_becomes_tool_call_frame() {
        let lines = vec![
            r#"{"candidates":[{"content":{"parts":[{"functionCall":{"name":"get_weather","args":{"city":"nyc"}}}],"role":"model"}}]}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        match frame.delta.unwrap().part {
            PartDelta::ToolCall(call) => assert_eq!(call.tool_name.as_deref(), Some("get_weather")),
            other => panic!("unexpected part delta: {other:?}"),
        }
    }

    #[tokio::test]
    async fn usage_metadata_chunk_is_forwarded() {
        let lines = vec![
            r#"{"candidates":[],"usageMetadata":{"promptTokenCount":4,"candidatesTokenCount":2}}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        assert!(frame.delta.is_none());
        assert_eq!(frame.usage.unwrap().input_tokens, 4);
    }
}
