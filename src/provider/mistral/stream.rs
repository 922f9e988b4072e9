use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LanguageModelError;
use crate::http::HttpBodyStream;
use crate::part_utils::guess_delta_index;
use crate::types::{ContentDelta, PartDelta, PartialModelResponse, TextPartDelta, ToolCallPartDelta};

use super::response::convert_usage;
use super::types::{MistralDeltaContent, MistralStreamChunk, MistralToolCallDelta};

const PROVIDER: &str = "mistral";

/// Adapts a Mistral Chat Completions SSE body into the normalized
/// [`PartialModelResponse`] stream. Wire shape mirrors OpenAI Chat
/// Completions closely enough that tool-call deltas need the same
/// [`guess_delta_index`] treatment to fold the `tool_calls[].index` array
/// into the unified content index space.
pub(crate) fn decode_stream(
    body: HttpBodyStream,
) -> impl Stream<Item = Result<PartialModelResponse, LanguageModelError>> + Send {
    let decoder = crate::stream::StreamDecoder::new(body, PROVIDER);
    let mut seen: Vec<ContentDelta> = Vec::new();

    decoder.filter_map(move |event| {
        let result = match event {
            Ok(crate::stream::StreamEvent::Done) => None,
            Ok(crate::stream::StreamEvent::Data(data)) => {
                match serde_json::from_str::<MistralStreamChunk>(&data) {
                    Ok(parsed) => handle_chunk(parsed, &mut seen),
                    Err(err) => Some(Err(LanguageModelError::invariant(
                        PROVIDER,
                        format!("failed to decode stream chunk: {err}"),
                    ))),
                }
            }
            Err(err) => Some(Err(err)),
        };
        std::future::ready(result)
    })
}

fn handle_chunk(
    chunk: MistralStreamChunk,
    seen: &mut Vec<ContentDelta>,
) -> Option<Result<PartialModelResponse, LanguageModelError>> {
    let choice = chunk.choices.into_iter().next();
    let delta = choice.and_then(|choice| choice.delta);

    let Some(delta) = delta else {
        return chunk.usage.map(|usage| {
            Ok(PartialModelResponse {
                delta: None,
                usage: Some(convert_usage(usage)),
                cost: None,
            })
        });
    };

    let text = match delta.content {
        Some(MistralDeltaContent::Text(text)) => Some(text),
        Some(MistralDeltaContent::Parts(parts)) => {
            let joined = parts
                .into_iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text)
                .collect::<String>();
            (!joined.is_empty()).then_some(joined)
        }
        None => None,
    };

    if let Some(text) = text.filter(|text| !text.is_empty()) {
        let part = PartDelta::Text(TextPartDelta { text, id: None });
        let index = guess_delta_index(&part, seen, None);
        let content_delta = ContentDelta { index, part };
        seen.push(content_delta.clone());
        return Some(Ok(PartialModelResponse {
            delta: Some(content_delta),
            usage: None,
            cost: None,
        }));
    }

    if let Some(tool_calls) = delta.tool_calls {
        if let Some(first) = tool_calls.into_iter().next() {
            let content_delta = convert_tool_call_delta(first, seen);
            seen.push(content_delta.clone());
            return Some(Ok(PartialModelResponse {
                delta: Some(content_delta),
                usage: None,
                cost: None,
            }));
        }
    }

    chunk.usage.map(|usage| {
        Ok(PartialModelResponse {
            delta: None,
            usage: Some(convert_usage(usage)),
            cost: None,
        })
    })
}

fn convert_tool_call_delta(delta: MistralToolCallDelta, seen: &[ContentDelta]) -> ContentDelta {
    let (tool_name, args) = delta
        .function
        .map(|function| (function.name, function.arguments))
        .unwrap_or((None, None));
    let part = PartDelta::ToolCall(ToolCallPartDelta {
        tool_call_id: delta.id,
        tool_name,
        args,
        id: None,
    });
    let index = guess_delta_index(&part, seen, delta.index);
    ContentDelta { index, part }
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
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":"hel"}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"content":"lo"}}]}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first.delta.as_ref().unwrap().index, 0);
        assert_eq!(second.delta.as_ref().unwrap().index, 0);
    }

    #[tokio::test]
    async fn two_tool_calls_get_distinct_indices() {
        let lines = vec![
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"a"}}]}}]}"#,
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":1,"id":"call_2","type":"function","function":{"name":"b"}}]}}]}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_ne!(first.delta.unwrap().index, second.delta.unwrap().index);
    }

    #[tokio::test]
    async fn usage_only_chunk_is_forwarded() {
        let lines = vec![r#"{"choices":[],"usage":{"prompt_tokens":4,"completion_tokens":2}}"#];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        assert!(frame.delta.is_none());
        assert_eq!(frame.usage.unwrap().input_tokens, 4);
    }
}
