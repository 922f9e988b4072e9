use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LanguageModelError;
use crate::http::HttpBodyStream;
use crate::types::{
    ContentDelta, PartDelta, PartialModelResponse, ReasoningPartDelta, TextPartDelta,
    ToolCallPartDelta,
};

use super::error::check_refusal;
use super::response::convert_usage;
use super::types::CohereStreamEvent;

const PROVIDER: &str = "cohere";

/// Adapts a Cohere `/v2/chat` SSE body into the normalized
/// [`PartialModelResponse`] stream.
///
/// Every Cohere stream event carries its own `index`, so this adapter (like
/// Anthropic's, unlike Google's) never needs `part_utils::guess_delta_index`.
pub(crate) fn decode_stream(
    body: HttpBodyStream,
) -> impl Stream<Item = Result<PartialModelResponse, LanguageModelError>> + Send {
    let decoder = crate::stream::StreamDecoder::new(body, PROVIDER);

    decoder.filter_map(move |event| {
        let result = match event {
            Ok(crate::stream::StreamEvent::Done) => None,
            Ok(crate::stream::StreamEvent::Data(data)) => {
                match serde_json::from_str::<CohereStreamEvent>(&data) {
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

fn handle_event(
    event: CohereStreamEvent,
) -> Option<Result<PartialModelResponse, LanguageModelError>> {
    match event {
        CohereStreamEvent::MessageStart => None,
        CohereStreamEvent::ContentStart { .. } => None,
        CohereStreamEvent::ContentDelta { index, delta } => {
            let text = delta.message.content;
            let part = if let Some(thinking) = text.thinking {
                PartDelta::Reasoning(ReasoningPartDelta {
                    text: thinking,
                    signature: None,
                    id: None,
                })
            } else {
                PartDelta::Text(TextPartDelta {
                    text: text.text.unwrap_or_default(),
                    id: None,
                })
            };
            Some(Ok(PartialModelResponse {
                delta: Some(ContentDelta { index, part }),
                usage: None,
                cost: None,
            }))
        }
        CohereStreamEvent::ContentEnd { .. } => None,
        CohereStreamEvent::ToolPlanDelta { .. } => None,
        CohereStreamEvent::ToolCallStart { index, delta } | CohereStreamEvent::ToolCallDelta { index, delta } => {
            let call = delta.message.tool_calls;
            Some(Ok(PartialModelResponse {
                delta: Some(ContentDelta {
                    index,
                    part: PartDelta::ToolCall(ToolCallPartDelta {
                        tool_call_id: call.id,
                        tool_name: call.function.as_ref().and_then(|f| f.name.clone()),
                        args: call.function.and_then(|f| f.arguments),
                        id: None,
                    }),
                }),
                usage: None,
                cost: None,
            }))
        }
        CohereStreamEvent::ToolCallEnd { .. } => None,
        // `PartDelta` has no `Source` variant: grounding citations only ever
        // arrive fully formed on the non-streaming response (`response.rs`).
        CohereStreamEvent::CitationStart { .. } => None,
        CohereStreamEvent::CitationEnd { .. } => None,
        CohereStreamEvent::MessageEnd { delta } => {
            check_refusal(delta.finish_reason.as_deref()).err().map(Err).or_else(|| {
                delta.usage.as_ref().map(|usage| {
                    Ok(PartialModelResponse {
                        delta: None,
                        usage: Some(convert_usage(usage)),
                        cost: None,
                    })
                })
            })
        }
    }
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
    async fn text_delta_becomes_content_delta_frame() {
        let lines = vec![
            r#"{"type":"content-start","index":0}"#,
            r#"{"type":"content-delta","index":0,"delta":{"message":{"content":{"text":"hi"}}}}"#,
            r#"{"type":"content-end","index":0}"#,
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
    async fn tool_call_delta_carries_argument_fragment() {
        let lines = vec![
            r#"{"type":"tool-call-start","index":1,"delta":{"message":{"tool_calls":{"id":"call_1","function":{"name":"search"}}}}}"#,
            r#"{"type":"tool-call-delta","index":1,"delta":{"message":{"tool_calls":{"function":{"arguments":"{\"q\""}}}}}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        match frame.delta.unwrap().part {
            PartDelta::ToolCall(call) => assert_eq!(call.tool_name.as_deref(), Some("search")),
            other => panic!("unexpected delta: {other:?}"),
        }
        let frame = stream.next().await.unwrap().unwrap();
        match frame.delta.unwrap().part {
            PartDelta::ToolCall(call) => assert_eq!(call.args.as_deref(), Some("{\"q\"")),
            other => panic!("unexpected delta: {other:?}"),
        }
    }

    #[tokio::test]
    async fn message_end_forwards_usage() {
        let lines = vec![
            r#"{"type":"message-end","delta":{"finish_reason":"COMPLETE","usage":{"billed_units":{"input_tokens":5.0,"output_tokens":2.0}}}}"#,
        ];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.usage.unwrap().output_tokens, 2);
    }

    #[tokio::test]
    async fn toxic_finish_reason_on_message_end_surfaces_as_error() {
        let lines = vec![r#"{"type":"message-end","delta":{"finish_reason":"ERROR_TOXIC"}}"#];
        let mut stream = Box::pin(decode_stream(body(lines)));
        let frame = stream.next().await.unwrap();
        assert!(matches!(frame, Err(LanguageModelError::Refusal(_, _))));
    }
}
