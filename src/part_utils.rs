//! Part-level helpers shared by every provider adapter: audio MIME mapping,
//! lossy down-conversion for unsupported modalities, and delta-index
//! inference for providers that do not supply a stable per-Part index.

use crate::error::LanguageModelError;
use crate::types::{
    AudioFormat, AudioPartDelta, ContentDelta, ImagePartDelta, Part, PartDelta, ReasoningPartDelta,
    SourcePart, TextPart, TextPartDelta, ToolCallPartDelta,
};

/// Maps an [`AudioFormat`] to the MIME type a provider's media field expects.
pub fn audio_format_to_mime(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Wav => "audio/wav",
        AudioFormat::Mp3 => "audio/mpeg",
        AudioFormat::Linear16 => "audio/l16",
        AudioFormat::Flac => "audio/flac",
        AudioFormat::Mulaw => "audio/basic",
        AudioFormat::Alaw => "audio/x-alaw-basic",
        AudioFormat::Aac => "audio/aac",
        AudioFormat::Opus => "audio/opus",
    }
}

/// Inverse of [`audio_format_to_mime`]; returns `None` for MIME types with no
/// corresponding [`AudioFormat`] variant.
pub fn mime_to_audio_format(mime_type: &str) -> Option<AudioFormat> {
    match mime_type {
        "audio/wav" | "audio/x-wav" => Some(AudioFormat::Wav),
        "audio/mpeg" | "audio/mp3" => Some(AudioFormat::Mp3),
        "audio/l16" | "audio/pcm" => Some(AudioFormat::Linear16),
        "audio/flac" | "audio/x-flac" => Some(AudioFormat::Flac),
        "audio/basic" => Some(AudioFormat::Mulaw),
        "audio/x-alaw-basic" => Some(AudioFormat::Alaw),
        "audio/aac" => Some(AudioFormat::Aac),
        "audio/opus" => Some(AudioFormat::Opus),
        _ => None,
    }
}

/// Flattens a [`SourcePart`] into one text block: `"{title}\n{source}\n\n{text content}"`,
/// for providers with no citation surface. Used as the down-conversion that
/// testable property 7 asserts: the textual substrate appears exactly once
/// in the provider request.
pub fn flatten_source_to_text(source: &SourcePart) -> TextPart {
    let mut buffer = format!("{}\n{}", source.title, source.source);
    for part in &source.content {
        if let Part::Text(text) = part {
            buffer.push('\n');
            buffer.push_str(&text.text);
        }
    }
    TextPart {
        text: buffer,
        id: source.id.clone(),
    }
}

/// Converts a completed [`Part`] back to its initial [`PartDelta`] form, used
/// by adapters that need to emit a synthetic "start" delta for a Part a
/// provider delivered whole (e.g. a non-streamed tool-call block embedded in
/// an otherwise-streamed response).
///
/// # Errors
/// Returns [`LanguageModelError::Invariant`] for `Source`/`ToolResult`, which
/// have no delta form.
pub fn loosely_convert_part_to_part_delta(
    provider: &'static str,
    part: Part,
) -> Result<PartDelta, LanguageModelError> {
    match part {
        Part::Text(TextPart { text, id }) => Ok(PartDelta::Text(TextPartDelta { text, id })),
        Part::Reasoning(reasoning) => Ok(PartDelta::Reasoning(ReasoningPartDelta {
            text: reasoning.text,
            signature: reasoning.signature,
            id: reasoning.id,
        })),
        Part::Audio(audio) => Ok(PartDelta::Audio(AudioPartDelta {
            audio_data: Some(audio.audio_data),
            format: Some(audio.format),
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            transcript: audio.transcript,
            id: audio.id,
        })),
        Part::Image(image) => Ok(PartDelta::Image(ImagePartDelta {
            image_data: Some(image.image_data),
            width: image.width,
            height: image.height,
            mime_type: Some(image.mime_type),
            id: image.id,
        })),
        Part::ToolCall(call) => Ok(PartDelta::ToolCall(ToolCallPartDelta {
            tool_call_id: Some(call.tool_call_id),
            tool_name: Some(call.tool_name),
            args: call.args.map(|v| v.to_string()),
            id: call.id,
        })),
        Part::Source(_) | Part::ToolResult(_) => Err(LanguageModelError::invariant(
            provider,
            "cannot convert part to part delta",
        )),
    }
}

/// Returns `true` when `a` and `b` are the same [`PartDelta`] variant
/// (ignoring field contents), used by [`guess_delta_index`] to decide
/// whether a delta continues the last open Part.
fn same_variant(a: &PartDelta, b: &PartDelta) -> bool {
    matches!(
        (a, b),
        (PartDelta::Text(_), PartDelta::Text(_))
            | (PartDelta::Reasoning(_), PartDelta::Reasoning(_))
            | (PartDelta::Audio(_), PartDelta::Audio(_))
            | (PartDelta::Image(_), PartDelta::Image(_))
            | (PartDelta::ToolCall(_), PartDelta::ToolCall(_))
    )
}

/// Synthesizes a stable `index` for a delta from a provider that does not
/// supply one directly (notably Google).
///
/// Rules (§4.2): a delta that continues the last open Part of the same
/// variant shares that Part's index; a delta that begins a new Part (new
/// tool-call id, different variant) gets the next unused index. For
/// tool-call deltas, `tool_call_index` is the provider's own separate
/// per-tool-call array index (if it has one), mapped onto the unified
/// interleaved index space.
pub fn guess_delta_index(
    part: &PartDelta,
    all_content_deltas: &[ContentDelta],
    tool_call_index: Option<usize>,
) -> usize {
    if let (PartDelta::ToolCall(_), Some(provider_index)) = (part, tool_call_index) {
        let mut seen = 0usize;
        for delta in all_content_deltas {
            if matches!(delta.part, PartDelta::ToolCall(_)) {
                if seen == provider_index {
                    return delta.index;
                }
                seen += 1;
            }
        }
        return all_content_deltas
            .iter()
            .map(|d| d.index)
            .max()
            .map_or(0, |m| m + 1);
    }

    if let Some(last) = all_content_deltas
        .iter()
        .rev()
        .find(|delta| same_variant(&delta.part, part))
    {
        // Only continue if it is the most recently opened Part overall —
        // otherwise this is a new Part of a variant seen earlier.
        if all_content_deltas
            .last()
            .map(|d| d.index == last.index)
            .unwrap_or(false)
        {
            return last.index;
        }
    }

    all_content_deltas
        .iter()
        .map(|d| d.index)
        .max()
        .map_or(0, |m| m + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentDelta, PartDelta, TextPartDelta, ToolCallPartDelta};

    #[test]
    fn continues_same_variant_when_last_open() {
        let deltas = vec![ContentDelta {
            index: 0,
            part: PartDelta::Text(TextPartDelta {
                text: "hel".into(),
                id: None,
            }),
        }];
        let next = PartDelta::Text(TextPartDelta {
            text: "lo".into(),
            id: None,
        });
        assert_eq!(guess_delta_index(&next, &deltas, None), 0);
    }

    #[test]
    fn starts_new_part_for_different_variant() {
        let deltas = vec![ContentDelta {
            index: 0,
            part: PartDelta::Text(TextPartDelta {
                text: "hi".into(),
                id: None,
            }),
        }];
        let next = PartDelta::ToolCall(ToolCallPartDelta {
            tool_call_id: Some("1".into()),
            ..Default::default()
        });
        assert_eq!(guess_delta_index(&next, &deltas, None), 1);
    }

    #[test]
    fn two_consecutive_tool_calls_get_distinct_indices() {
        let mut deltas: Vec<ContentDelta> = Vec::new();
        let first = PartDelta::ToolCall(ToolCallPartDelta {
            tool_call_id: Some("a".into()),
            tool_name: Some("search".into()),
            ..Default::default()
        });
        let idx0 = guess_delta_index(&first, &deltas, Some(0));
        deltas.push(ContentDelta {
            index: idx0,
            part: first,
        });

        let second = PartDelta::ToolCall(ToolCallPartDelta {
            tool_call_id: Some("b".into()),
            tool_name: Some("search".into()),
            ..Default::default()
        });
        let idx1 = guess_delta_index(&second, &deltas, Some(1));
        assert_ne!(idx0, idx1);
    }

    #[test]
    fn flattens_source_part_text_substrate_once() {
        let source = SourcePart {
            source: "https://example.com".into(),
            title: "Example".into(),
            content: vec![Part::text("substrate")],
            id: None,
        };
        let flattened = flatten_source_to_text(&source);
        assert_eq!(flattened.text.matches("substrate").count(), 1);
    }
}
