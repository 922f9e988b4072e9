use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LanguageModelError;
use crate::http::HttpBodyStream;
use crate::types::{
    ContentDelta, PartDelta, PartialModelResponse, ReasoningPartDelta, TextPartDelta,
    ToolCallPartDelta,
};

use super::error::check_refusal;
use super::request::STRUCTURED_OUTPUT_TOOL;
use super::response::convert_usage;
use super::types::{AnthropicContentDelta, AnthropicStreamEvent};

/// Adapts an Anthropic Messages SSE body into the normalized
/// [`PartialModelResponse`] stream.
///
/// Anthropic's `content_block_start`/`_delta`/`_stop` triad already carries a
/// stable per-block `index`, so unlike Google this adapter never needs
/// `part_utils::guess_delta_index`.
pub(crate) fn decode_stream(
    body: HttpBodyStream,
) -> impl Stream<Item = Result<PartialModelResponse, LanguageModelError>> + Send {
    let decoder = crate::stream::StreamDecoder::new(body, "anthropic_messages");
    let mut structured_output_index: Option<usize> = None;

    decoder.filter_map(move |event| {
        let result = match event {
            Ok(crate::stream::StreamEvent::Done) => None,
            Ok(crate::stream::StreamEvent::Data(data)) => {
                match serde_json::from_str::<AnthropicStreamEvent>(&data) {
                    Ok(parsed) => handle_event(parsed, &mut structured_output_index),
                    Err(err) => Some(Err(LanguageModelError::invariant(
                        "anthropic_messages",
                        format!("failed to decode stream event: {err}"),
                    ))),
                }
            }
            Err(err) => Some(Err(err)),
        };
        std::future::ready(result)
    })
}

fn handle_event(
    event: AnthropicStreamEvent,
    structured_output_index: &mut Option<usize>,
) -> Option<Result<PartialModelResponse, LanguageModelError>> {
    match event {
        AnthropicStreamEvent::MessageStart { .. } => None,
        AnthropicStreamEvent::Ping => None,
        AnthropicStreamEvent::ContentBlockStart {
            index,
            content_block,
        } => {
            if content_block.kind == "tool_use"
                && content_block.name.as_deref() == Some(STRUCTURED_OUTPUT_TOOL)
            {
                *structured_output_index = Some(index);
                return Some(Ok(PartialModelResponse {
                    delta: Some(ContentDelta {
                        index,
                        part: PartDelta::Text(TextPartDelta {
                            text: String::new(),
                            id: None,
                        }),
                    }),
                    usage: None,
                    cost: None,
                }));
            }
            match content_block.kind.as_str() {
                "tool_use" => Some(Ok(PartialModelResponse {
                    delta: Some(ContentDelta {
                        index,
                        part: PartDelta::ToolCall(ToolCallPartDelta {
                            tool_call_id: content_block.id,
                            tool_name: content_block.name,
                            args: None,
                            id: None,
                        }),
                    }),
                    usage: None,
                    cost: None,
                })),
                _ => None,
            }
        }
        AnthropicStreamEvent::ContentBlockDelta { index, delta } => {
            let is_structured_output = *structured_output_index == Some(index);
            let part = match delta {
                AnthropicContentDelta::Text { text } => PartDelta::Text(TextPartDelta {
                    text,
                    id: None,
                }),
                AnthropicContentDelta::Thinking { thinking } => {
                    PartDelta::Reasoning(ReasoningPartDelta {
                        text: thinking,
                        signature: None,
                        id: None,
                    })
                }
                AnthropicContentDelta::Signature { signature } => {
                    PartDelta::Reasoning(ReasoningPartDelta {
                        text: String::new(),
                        signature: Some(signature),
                        id: None,
                    })
                }
                AnthropicContentDelta::InputJson { partial_json } => {
                    if is_structured_output {
                        PartDelta::Text(TextPartDelta {
                            text: partial_json,
                            id: None,
                        })
                    } else {
                        PartDelta::ToolCall(ToolCallPartDelta {
                            tool_call_id: None,
                            tool_name: None,
                            args: Some(partial_json),
                            id: None,
                        })
                    }
                }
            };
            Some(Ok(PartialModelResponse {
                delta: Some(ContentDelta { index, part }),
                usage: None,
                cost: None,
            }))
        }
        AnthropicStreamEvent::ContentBlockStop { .. } => None,
        AnthropicStreamEvent::MessageDelta { usage } => {
            usage.as_ref().map(|usage| {
                Ok(PartialModelResponse {
                    delta: None,
                    usage: Some(convert_usage(usage)),
                    cost: None,
                })
            })
        }
        AnthropicStreamEvent::MessageStop => None,
        AnthropicStreamEvent::Error { error } => {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            Some(Err(LanguageModelError::provider(
                "anthropic_messages",
                0,
                message,
                None,
            )))
        }
    }
}

/// Checks a completed message's `stop_reason` for the refusal sentinel.
/// Exposed for `provider.rs`, which tracks `stop_reason` out-of-band since
/// streaming never carries it on a single frame.
pub(crate) fn check_stream_refusal(stop_reason: Option<&str>) -> Result<(), LanguageModelError> {
    check_refusal(stop_reason)
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
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#,
            r#"{"type":"message_stop"}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        let delta = frame.delta.unwrap();
        match delta.part {
            PartDelta::Text(text) => assert_eq!(text.text, ""),
            other => panic!("unexpected delta: {other:?}"),
        }
        let frame = stream.next().await.unwrap().unwrap();
        match frame.delta.unwrap().part {
            PartDelta::Text(text) => assert_eq!(text.text, "hi"),
            other => panic!("unexpected delta: {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn structured_output_tool_input_json_emits_as_text_delta() {
        let lines = vec![
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"call_1","name":"__structured_output__","input":{}}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"a\":1}"}}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let _start = stream.next().await.unwrap().unwrap();
        let frame = stream.next().await.unwrap().unwrap();
        match frame.delta.unwrap().part {
            PartDelta::Text(text) => assert_eq!(text.text, "{\"a\":1}"),
            other => panic!("expected text delta for structured output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn message_delta_usage_is_forwarded() {
        let lines = vec![
            r#"{"type":"message_delta","usage":{"output_tokens":12}}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        assert!(frame.delta.is_none());
        assert_eq!(frame.usage.unwrap().output_tokens, 12);
    }
}
