use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LanguageModelError;

/// Who produced a [`Message`].
///
/// The wire form is exactly `"user" | "assistant" | "tool"`; there is no
/// `system` role here because system instructions travel on
/// [`crate::types::request::LanguageModelInput::system_prompt`], never as a
/// message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// One turn of a conversation: a role plus an ordered list of [`Part`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<Part>,
}

impl Message {
    pub fn user(content: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant(content: Vec<Part>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool(content: Vec<Part>) -> Self {
        Self {
            role: Role::Tool,
            content,
        }
    }

    /// Checks the per-role content invariant from the data model: a `tool`
    /// message contains only tool-result parts; a `user` message contains
    /// only user-addressable parts; an `assistant` message contains only
    /// assistant-addressable parts.
    ///
    /// # Errors
    /// Returns [`LanguageModelError::InvalidInput`] when a part is not
    /// addressable from this message's role.
    pub fn validate(&self) -> Result<(), LanguageModelError> {
        for part in &self.content {
            let allowed = match (self.role, part) {
                (Role::Tool, Part::ToolResult(_)) => true,
                (Role::Tool, _) => false,
                (Role::User, Part::Text(_) | Part::Image(_) | Part::Audio(_) | Part::Source(_)) => {
                    true
                }
                (Role::User, _) => false,
                (
                    Role::Assistant,
                    Part::Text(_) | Part::Image(_) | Part::Audio(_) | Part::Reasoning(_) | Part::ToolCall(_),
                ) => true,
                (Role::Assistant, _) => false,
            };
            if !allowed {
                return Err(LanguageModelError::InvalidInput(format!(
                    "part {part:?} is not addressable from a {:?} message",
                    self.role
                )));
            }
        }
        Ok(())
    }
}

/// Audio encoding carried by [`AudioPart`]/[`AudioPartDelta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Linear16,
    Flac,
    Mulaw,
    Alaw,
    Aac,
    Opus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePart {
    pub image_data: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPart {
    pub audio_data: String,
    pub format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub channels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPart {
    pub text: String,
    /// Opaque, provider-scoped. Round-tripped byte-for-byte; only the model
    /// that emitted it may interpret it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

/// Citation substrate. `content` never nests another [`SourcePart`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePart {
    pub source: String,
    pub title: String,
    pub content: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

/// Tool results contain Parts but never recursively contain another
/// tool-result (no cycles in the data model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub content: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_error: Option<bool>,
}

/// Smallest unit of message content. A sealed sum type discriminated by
/// `type` on the wire; never modeled as an open inheritance hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text(TextPart),
    Image(ImagePart),
    Audio(AudioPart),
    Reasoning(ReasoningPart),
    Source(SourcePart),
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(TextPart {
            text: text.into(),
            id: None,
        })
    }

    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Option<Value>,
    ) -> Self {
        Part::ToolCall(ToolCallPart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
            id: None,
        })
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: Vec<Part>,
        is_error: bool,
    ) -> Self {
        Part::ToolResult(ToolResultPart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            content,
            is_error: if is_error { Some(true) } else { None },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPartDelta {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningPartDelta {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioPartDelta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audio_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub format: Option<AudioFormat>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub channels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagePartDelta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolCallPartDelta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_name: Option<String>,
    /// Append-only fragment of the JSON-encoded `args` object; concatenated
    /// and parsed once the tool-call part is finalized.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub args: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

/// Partial form of a [`Part`] carried by a [`ContentDelta`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PartDelta {
    Text(TextPartDelta),
    Reasoning(ReasoningPartDelta),
    Audio(AudioPartDelta),
    Image(ImagePartDelta),
    ToolCall(ToolCallPartDelta),
}

/// Append-wise partial update to the Part living at `index` in the eventual
/// ordered content array. Deltas with the same index merge in arrival
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDelta {
    pub index: usize,
    pub part: PartDelta,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Testable property 1 (round-trip): serialize, deserialize, re-serialize
    /// must produce byte-identical JSON.
    #[test]
    fn message_round_trip_is_stable() {
        let message = Message::assistant(vec![
            Part::text("hello"),
            Part::tool_call("call_1", "lookup", Some(serde_json::json!({"q": "rust"}))),
        ]);
        let first = serde_json::to_string(&message).unwrap();
        let decoded: Message = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&decoded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn part_discriminators_are_kebab_case() {
        let value = serde_json::to_value(Part::text("hi")).unwrap();
        assert_eq!(value["type"], serde_json::json!("text"));

        let value = serde_json::to_value(Part::ToolResult(ToolResultPart {
            tool_call_id: "1".into(),
            tool_name: "t".into(),
            content: vec![],
            is_error: None,
        }))
        .unwrap();
        assert_eq!(value["type"], serde_json::json!("tool-result"));
    }

    #[test]
    fn tool_message_rejects_non_tool_result_parts() {
        let message = Message::tool(vec![Part::text("not allowed here")]);
        assert!(message.validate().is_err());
    }

    #[test]
    fn optional_fields_are_omitted_not_null() {
        let value = serde_json::to_value(Part::text("hi")).unwrap();
        assert!(value.get("id").is_none());
    }
}
