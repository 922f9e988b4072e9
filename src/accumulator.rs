//! Folds an ordered sequence of [`PartialModelResponse`]s into a finalized
//! [`ModelResponse`], per §4.3. Identical semantics across every provider
//! adapter: the accumulator never looks at which provider produced a delta.

use std::collections::HashMap;

use crate::error::LanguageModelError;
use crate::types::{
    AudioPartDelta, ContentDelta, ImagePartDelta, ModelResponse, ModelUsage, Part, PartDelta,
    PartialModelResponse, ReasoningPartDelta, TextPartDelta, ToolCallPartDelta,
};

/// Consumes a stream of [`PartialModelResponse`]s and exposes both an
/// incremental view of the Parts built so far and the finalized
/// [`ModelResponse`].
///
/// The Parts array is dense: a delta at `index = k` where `k` is more than
/// one past the current maximum index is rejected as
/// [`LanguageModelError::Invariant`] (§4.3).
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    parts: Vec<Part>,
    /// Still-concatenating `args` fragments for in-progress tool-call Parts,
    /// keyed by index. Kept out of `ToolCallPart.args` so `current_parts()`
    /// never exposes a partial/unparsed fragment to callers.
    pending_tool_args: HashMap<usize, String>,
    usage: Option<ModelUsage>,
    cost: Option<f64>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one partial response into the running state.
    ///
    /// # Errors
    /// Returns [`LanguageModelError::Invariant`] when a delta's index skips
    /// over an unfilled slot.
    pub fn add_partial(
        &mut self,
        provider: &'static str,
        partial: &PartialModelResponse,
    ) -> Result<(), LanguageModelError> {
        if let Some(delta) = &partial.delta {
            self.add_delta(provider, delta)?;
        }
        if let Some(usage) = &partial.usage {
            self.usage.get_or_insert_with(Default::default).add(usage);
        }
        if let Some(cost) = partial.cost {
            *self.cost.get_or_insert(0.0) += cost;
        }
        Ok(())
    }

    /// Folds one [`ContentDelta`] into the running Parts array.
    pub fn add_delta(
        &mut self,
        provider: &'static str,
        delta: &ContentDelta,
    ) -> Result<(), LanguageModelError> {
        if delta.index > self.parts.len() {
            return Err(LanguageModelError::invariant(
                provider,
                format!(
                    "delta index {} skips ahead of current length {}",
                    delta.index,
                    self.parts.len()
                ),
            ));
        }

        if delta.index == self.parts.len() {
            let seeded = seed_part(&delta.part);
            self.parts.push(seeded);
        }

        merge_part_delta(
            provider,
            &mut self.parts[delta.index],
            &delta.part,
            &mut self.pending_tool_args,
            delta.index,
        )
    }

    /// Current Parts built so far, without finalizing (e.g. without parsing
    /// tool-call `args` JSON). Used for incremental display.
    pub fn current_parts(&self) -> &[Part] {
        &self.parts
    }

    /// Consumes the accumulator and returns the finalized [`ModelResponse`],
    /// parsing any pending tool-call `args` JSON fragments.
    ///
    /// # Errors
    /// Returns [`LanguageModelError::Invariant`] if an accumulated tool-call
    /// `args` fragment is not valid JSON.
    pub fn finalize(self, provider: &'static str) -> Result<ModelResponse, LanguageModelError> {
        let mut pending_tool_args = self.pending_tool_args;
        let mut content = Vec::with_capacity(self.parts.len());
        for (index, part) in self.parts.into_iter().enumerate() {
            let pending = pending_tool_args.remove(&index).unwrap_or_default();
            content.push(finalize_part(provider, part, pending)?);
        }
        Ok(ModelResponse {
            content,
            usage: self.usage,
            cost: self.cost,
        })
    }
}

/// Creates the initial empty Part for a new index, based on the variant of
/// the first delta that targets it.
fn seed_part(part_delta: &PartDelta) -> Part {
    match part_delta {
        PartDelta::Text(_) => Part::text(""),
        PartDelta::Reasoning(_) => Part::Reasoning(crate::types::ReasoningPart {
            text: String::new(),
            signature: None,
            id: None,
        }),
        PartDelta::Audio(_) => Part::Audio(crate::types::AudioPart {
            audio_data: String::new(),
            format: crate::types::AudioFormat::Wav,
            sample_rate: None,
            channels: None,
            transcript: None,
            id: None,
        }),
        PartDelta::Image(_) => Part::Image(crate::types::ImagePart {
            image_data: String::new(),
            mime_type: String::new(),
            width: None,
            height: None,
            id: None,
        }),
        PartDelta::ToolCall(_) => Part::ToolCall(crate::types::ToolCallPart {
            tool_call_id: String::new(),
            tool_name: String::new(),
            args: None,
            id: None,
        }),
    }
}

fn merge_part_delta(
    provider: &'static str,
    part: &mut Part,
    delta: &PartDelta,
    pending_tool_args: &mut HashMap<usize, String>,
    index: usize,
) -> Result<(), LanguageModelError> {
    match (part, delta) {
        (Part::Text(text), PartDelta::Text(TextPartDelta { text: frag, id })) => {
            text.text.push_str(frag);
            if text.id.is_none() {
                text.id = id.clone();
            }
            Ok(())
        }
        (
            Part::Reasoning(reasoning),
            PartDelta::Reasoning(ReasoningPartDelta { text, signature, id }),
        ) => {
            reasoning.text.push_str(text);
            if reasoning.signature.is_none() {
                reasoning.signature = signature.clone();
            }
            if reasoning.id.is_none() {
                reasoning.id = id.clone();
            }
            Ok(())
        }
        (
            Part::Audio(audio),
            PartDelta::Audio(AudioPartDelta {
                audio_data,
                format,
                sample_rate,
                channels,
                transcript,
                id,
            }),
        ) => {
            if let Some(fragment) = audio_data {
                audio.audio_data.push_str(fragment);
            }
            if let Some(format) = format {
                audio.format = *format;
            }
            if audio.sample_rate.is_none() {
                audio.sample_rate = *sample_rate;
            }
            if audio.channels.is_none() {
                audio.channels = *channels;
            }
            match (&mut audio.transcript, transcript) {
                (Some(existing), Some(fragment)) => existing.push_str(fragment),
                (None, Some(fragment)) => audio.transcript = Some(fragment.clone()),
                _ => {}
            }
            if audio.id.is_none() {
                audio.id = id.clone();
            }
            Ok(())
        }
        (
            Part::Image(image),
            PartDelta::Image(ImagePartDelta {
                image_data,
                width,
                height,
                mime_type,
                id,
            }),
        ) => {
            if let Some(fragment) = image_data {
                image.image_data.push_str(fragment);
            }
            if image.width.is_none() {
                image.width = *width;
            }
            if image.height.is_none() {
                image.height = *height;
            }
            if image.mime_type.is_empty() {
                if let Some(mime_type) = mime_type {
                    image.mime_type = mime_type.clone();
                }
            }
            if image.id.is_none() {
                image.id = id.clone();
            }
            Ok(())
        }
        (
            Part::ToolCall(call),
            PartDelta::ToolCall(ToolCallPartDelta {
                tool_call_id,
                tool_name,
                args,
                id,
            }),
        ) => {
            if call.tool_call_id.is_empty() {
                if let Some(value) = tool_call_id {
                    call.tool_call_id = value.clone();
                }
            }
            if call.tool_name.is_empty() {
                if let Some(value) = tool_name {
                    call.tool_name = value.clone();
                }
            }
            if let Some(fragment) = args {
                pending_tool_args.entry(index).or_default().push_str(fragment);
            }
            if call.id.is_none() {
                call.id = id.clone();
            }
            Ok(())
        }
        (existing, _) => Err(LanguageModelError::invariant(
            provider,
            format!("delta variant does not match existing part at this index: {existing:?}"),
        )),
    }
}

/// Parses the pending `args` fragment (if any) into the final JSON object,
/// per the rule in §4.2: empty concatenation parses to `null`.
fn finalize_part(provider: &'static str, part: Part, pending_args: String) -> Result<Part, LanguageModelError> {
    match part {
        Part::ToolCall(mut call) => {
            call.args = if pending_args.trim().is_empty() {
                None
            } else {
                Some(serde_json::from_str(&pending_args).map_err(|err| {
                    LanguageModelError::invariant(
                        provider,
                        format!("tool-call args did not parse as JSON: {err}"),
                    )
                })?)
            };
            Ok(Part::ToolCall(call))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_delta(index: usize, text: &str) -> ContentDelta {
        ContentDelta {
            index,
            part: PartDelta::Text(TextPartDelta {
                text: text.to_string(),
                id: None,
            }),
        }
    }

    #[test]
    fn concatenates_text_deltas_at_same_index() {
        let mut acc = StreamAccumulator::new();
        acc.add_delta("test", &text_delta(0, "Hello, ")).unwrap();
        acc.add_delta("test", &text_delta(0, "world!")).unwrap();
        let response = acc.finalize("test").unwrap();
        assert_eq!(response.content.len(), 1);
        match &response.content[0] {
            Part::Text(text) => assert_eq!(text.text, "Hello, world!"),
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn rejects_index_skipping_a_slot() {
        let mut acc = StreamAccumulator::new();
        let err = acc.add_delta("test", &text_delta(1, "oops")).unwrap_err();
        assert!(matches!(err, LanguageModelError::Invariant(_, _)));
    }

    #[test]
    fn tool_call_args_concatenate_and_parse() {
        let mut acc = StreamAccumulator::new();
        acc.add_delta(
            "test",
            &ContentDelta {
                index: 0,
                part: PartDelta::ToolCall(ToolCallPartDelta {
                    tool_call_id: Some("call_1".into()),
                    tool_name: Some("lookup".into()),
                    args: Some("{\"q\":".into()),
                    id: None,
                }),
            },
        )
        .unwrap();
        acc.add_delta(
            "test",
            &ContentDelta {
                index: 0,
                part: PartDelta::ToolCall(ToolCallPartDelta {
                    tool_call_id: None,
                    tool_name: None,
                    args: Some("\"rust\"}".into()),
                    id: None,
                }),
            },
        )
        .unwrap();
        let response = acc.finalize("test").unwrap();
        match &response.content[0] {
            Part::ToolCall(call) => {
                assert_eq!(call.tool_call_id, "call_1");
                assert_eq!(call.args, Some(serde_json::json!({"q": "rust"})));
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn current_parts_does_not_expose_pending_tool_call_args() {
        let mut acc = StreamAccumulator::new();
        acc.add_delta(
            "test",
            &ContentDelta {
                index: 0,
                part: PartDelta::ToolCall(ToolCallPartDelta {
                    tool_call_id: Some("call_1".into()),
                    tool_name: Some("lookup".into()),
                    args: Some("{\"q\":".into()),
                    id: None,
                }),
            },
        )
        .unwrap();
        match &acc.current_parts()[0] {
            Part::ToolCall(call) => assert_eq!(call.args, None, "pending args fragment must never leak through current_parts()"),
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn empty_tool_call_args_finalize_to_null() {
        let mut acc = StreamAccumulator::new();
        acc.add_delta(
            "test",
            &ContentDelta {
                index: 0,
                part: PartDelta::ToolCall(ToolCallPartDelta {
                    tool_call_id: Some("call_1".into()),
                    tool_name: Some("noop".into()),
                    args: None,
                    id: None,
                }),
            },
        )
        .unwrap();
        let response = acc.finalize("test").unwrap();
        match &response.content[0] {
            Part::ToolCall(call) => assert_eq!(call.args, None),
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn usage_and_cost_sum_across_partials() {
        let mut acc = StreamAccumulator::new();
        acc.add_partial(
            "test",
            &PartialModelResponse {
                delta: None,
                usage: Some(ModelUsage {
                    input_tokens: 10,
                    output_tokens: 1,
                    ..Default::default()
                }),
                cost: Some(0.01),
            },
        )
        .unwrap();
        acc.add_partial(
            "test",
            &PartialModelResponse {
                delta: None,
                usage: Some(ModelUsage {
                    input_tokens: 0,
                    output_tokens: 4,
                    ..Default::default()
                }),
                cost: Some(0.02),
            },
        )
        .unwrap();
        let response = acc.finalize("test").unwrap();
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 5);
        assert!((response.cost.unwrap() - 0.03).abs() < 1e-12);
    }

    /// Testable property 2 (accumulator idempotence): splitting the delta
    /// stream at any point and restarting from the intermediate finalized
    /// Parts produces the same final content, since finalize only affects
    /// tool-call args parsing which is idempotent once done.
    #[test]
    fn split_and_restart_matches_single_pass() {
        let deltas = vec![text_delta(0, "a"), text_delta(0, "b"), text_delta(0, "c")];

        let mut whole = StreamAccumulator::new();
        for delta in &deltas {
            whole.add_delta("test", delta).unwrap();
        }
        let whole_result = whole.finalize("test").unwrap();

        let mut first_half = StreamAccumulator::new();
        first_half.add_delta("test", &deltas[0]).unwrap();
        let intermediate = first_half.finalize("test").unwrap();

        let mut restarted = StreamAccumulator::new();
        for (index, part) in intermediate.content.into_iter().enumerate() {
            restarted
                .add_delta(
                    "test",
                    &ContentDelta {
                        index,
                        part: crate::part_utils::loosely_convert_part_to_part_delta("test", part)
                            .unwrap(),
                    },
                )
                .unwrap();
        }
        for delta in &deltas[1..] {
            restarted.add_delta("test", delta).unwrap();
        }
        let restarted_result = restarted.finalize("test").unwrap();

        assert_eq!(whole_result.content, restarted_result.content);
    }
}
