use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LanguageModelError;
use crate::http::HttpBodyStream;
use crate::part_utils::guess_delta_index;
use crate::types::{ContentDelta, PartDelta, PartialModelResponse, TextPartDelta, ToolCallPartDelta};

use super::response::convert_usage;
use super::types::{OpenAiDeltaContent, OpenAiStreamChunk, OpenAiToolCallDelta};

const PROVIDER: &str = "openai_chat";

/// Adapts an OpenAI Chat Completions SSE body into the normalized
/// [`PartialModelResponse`] stream.
///
/// Chat Completions gives tool-call deltas their own `index` into the
/// `tool_calls` array, separate from content position, so this adapter
/// relies on [`guess_delta_index`] to fold both into one interleaved index
/// space the way the accumulator expects.
pub(crate) fn decode_stream(
    body: HttpBodyStream,
) -> impl Stream<Item = Result<PartialModelResponse, LanguageModelError>> + Send {
    let decoder = crate::stream::StreamDecoder::new(body, PROVIDER);
    let mut seen: Vec<ContentDelta> = Vec::new();

    decoder.filter_map(move |event| {
        let result = match event {
            Ok(crate::stream::StreamEvent::Done) => None,
            Ok(crate::stream::StreamEvent::Data(data)) => {
                match serde_json::from_str::<OpenAiStreamChunk>(&data) {
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
    chunk: OpenAiStreamChunk,
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
        Some(OpenAiDeltaContent::Text(text)) => Some(text),
        Some(OpenAiDeltaContent::Parts(parts)) => {
            let joined = parts
                .into_iter()
                .filter(|part| part.kind == "text" || part.kind == "input_text")
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

fn convert_tool_call_delta(delta: OpenAiToolCallDelta, seen: &[ContentDelta]) -> ContentDelta {
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
