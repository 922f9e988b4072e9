use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LanguageModelError;
use crate::http::HttpBodyStream;
use crate::types::{
    ContentDelta, PartDelta, PartialModelResponse, ReasoningPartDelta, TextPartDelta,
    ToolCallPartDelta,
};

use super::response::convert_usage;
use super::types::ResponsesStreamEvent;

const PROVIDER: &str = "openai.responses";

/// Adapts an OpenAI Responses SSE body into the normalized
/// [`PartialModelResponse`] stream.
///
/// Responses events carry a stable `output_index` per output item, so this
/// adapter (unlike Google) never needs `part_utils::guess_delta_index`.
pub(crate) fn decode_stream(
    body: HttpBodyStream,
) -> impl Stream<Item = Result<PartialModelResponse, LanguageModelError>> + Send {
    let decoder = crate::stream::StreamDecoder::new(body, PROVIDER);

    decoder.filter_map(|event| {
        let result = match event {
            Ok(crate::stream::StreamEvent::Done) => None,
            Ok(crate::stream::StreamEvent::Data(data)) => {
                match serde_json::from_str::<ResponsesStreamEvent>(&data) {
                    Ok(parsed) => handle_event(parsed),
                    Err(err) => Some(Err(LanguageModelError::invariant(
                        PROVIDER,
                        format!("failed to decode stream event: {err}"),
                    ))),
                }
            }
            Err(err) => Some(Err(err)),
        };
        std::future::ready(result)
    })
}

fn handle_event(event: ResponsesStreamEvent) -> Option<Result<PartialModelResponse, LanguageModelError>> {
    match event.event_type.as_str() {
        "response.output_item.added" => {
            let index = event.output_index.unwrap_or(0);
            let item = event.item?;
            let part = match item.kind.as_str() {
                "function_call" => PartDelta::ToolCall(ToolCallPartDelta {
                    tool_call_id: item.call_id,
                    tool_name: item.name,
                    args: None,
                    id: item.id,
                }),
                "reasoning" => PartDelta::Reasoning(ReasoningPartDelta {
                    text: String::new(),
                    signature: item.encrypted_content,
                    id: item.id,
                }),
                _ => return None,
            };
            Some(Ok(PartialModelResponse {
                delta: Some(ContentDelta { index, part }),
                usage: None,
                cost: None,
            }))
        }
        "response.output_text.delta" => {
            let index = event.output_index.unwrap_or(0);
            let text = event.delta.unwrap_or_default();
            if text.is_empty() {
                return None;
            }
            Some(Ok(PartialModelResponse {
                delta: Some(ContentDelta {
                    index,
                    part: PartDelta::Text(TextPartDelta { text, id: None }),
                }),
                usage: None,
                cost: None,
            }))
        }
        "response.function_call_arguments.delta" => {
            let index = event.output_index.unwrap_or(0);
            let fragment = event.delta.unwrap_or_default();
            Some(Ok(PartialModelResponse {
                delta: Some(ContentDelta {
                    index,
                    part: PartDelta::ToolCall(ToolCallPartDelta {
                        tool_call_id: None,
                        tool_name: None,
                        args: Some(fragment),
                        id: None,
                    }),
                }),
                usage: None,
                cost: None,
            }))
        }
        "response.reasoning_summary_text.delta" => {
            let index = event.output_index.unwrap_or(0);
            let fragment = event.delta.unwrap_or_default();
            Some(Ok(PartialModelResponse {
                delta: Some(ContentDelta {
                    index,
                    part: PartDelta::Reasoning(ReasoningPartDelta {
                        text: fragment,
                        signature: None,
                        id: None,
                    }),
                }),
                usage: None,
                cost: None,
            }))
        }
        "response.completed" | "response.incomplete" => {
            let response = event.response?;
            let usage = response.usage.map(convert_usage);
            usage.map(|usage| {
                Ok(PartialModelResponse {
                    delta: None,
                    usage: Some(usage),
                    cost: None,
                })
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{StreamExt, stream};

    fn body(lines: Vec<&str>) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, LanguageModelError>> = lines
            .into_iter()
            .map(|line| Ok(format!("data: {line}\n\n").into_bytes()))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn text_delta_becomes_content_delta_frame() {
        let lines = vec![
            r#"{"type":"response.output_text.delta","output_index":0,"delta":"hi"}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        match frame.delta.unwrap().part {
            PartDelta::Text(text) => assert_eq!(text.text, "hi"),
            other => panic!("unexpected delta: {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn function_call_item_then_arguments_delta() {
        let lines = vec![
            r#"{"type":"response.output_item.added","output_index":0,"item":{"type":"function_call","call_id":"call_1","name":"lookup"}}"#,
            r#"{"type":"response.function_call_arguments.delta","output_index":0,"delta":"{\"q\":1}"}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let first = stream.next().await.unwrap().unwrap();
        match first.delta.unwrap().part {
            PartDelta::ToolCall(call) => {
                assert_eq!(call.tool_call_id.as_deref(), Some("call_1"));
                assert_eq!(call.tool_name.as_deref(), Some("lookup"));
            }
            other => panic!("unexpected delta: {other:?}"),
        }
        let second = stream.next().await.unwrap().unwrap();
        match second.delta.unwrap().part {
            PartDelta::ToolCall(call) => assert_eq!(call.args.as_deref(), Some("{\"q\":1}")),
            other => panic!("unexpected delta: {other:?}"),
        }
    }

    #[tokio::test]
    async fn completed_event_emits_usage() {
        let lines = vec![
            r#"{"type":"response.completed","response":{"output":[],"usage":{"input_tokens":10,"output_tokens":5}}}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        assert!(frame.delta.is_none());
        let usage = frame.usage.unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 5);
    }
}
