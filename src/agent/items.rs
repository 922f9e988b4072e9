use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{LanguageModelInput, Message, ModelUsage, Part};

/// The captured outcome of one model call within a Run (§3.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelItem {
    pub content: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub usage: Option<ModelUsage>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cost: Option<f64>,
    /// Snapshot of the input actually sent to the model for this call.
    pub input: LanguageModelInput,
}

/// The outcome of one tool execution within a Run (§3.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolItem {
    pub tool_call_id: String,
    pub tool_name: String,
    /// The parsed call arguments (object form, not the JSON string).
    pub input: Value,
    pub output: Vec<Part>,
    pub is_error: bool,
}

/// One immutable entry in a Run's output, per §3.5. The ordered sequence of
/// items for a run is the conversation to append for the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentItem {
    Message(Message),
    Model(ModelItem),
    Tool(ToolItem),
}

/// Turns a list of [`AgentItem`]s into the equivalent `Message` sequence
/// (§4.6 step 3): a `message` item passes through unchanged, a `model` item
/// becomes an assistant Message carrying its Parts, and `tool` items
/// contiguous in time are packed into one tool Message.
pub fn items_to_messages(items: &[AgentItem]) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut pending_tool_results = Vec::new();

    for item in items {
        match item {
            AgentItem::Tool(tool_item) => {
                pending_tool_results.push(Part::tool_result(
                    tool_item.tool_call_id.clone(),
                    tool_item.tool_name.clone(),
                    tool_item.output.clone(),
                    tool_item.is_error,
                ));
                continue;
            }
            AgentItem::Message(message) => {
                flush_pending_tool_results(&mut messages, &mut pending_tool_results);
                messages.push(message.clone());
            }
            AgentItem::Model(model_item) => {
                flush_pending_tool_results(&mut messages, &mut pending_tool_results);
                messages.push(Message::assistant(model_item.content.clone()));
            }
        }
    }
    flush_pending_tool_results(&mut messages, &mut pending_tool_results);

    messages
}

fn flush_pending_tool_results(messages: &mut Vec<Message>, pending: &mut Vec<Part>) {
    if !pending.is_empty() {
        messages.push(Message::tool(std::mem::take(pending)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn message_item_passes_through_unchanged() {
        let items = vec![AgentItem::Message(Message::user(vec![Part::text("hi")]))];
        let messages = items_to_messages(&items);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
    }

    #[test]
    fn model_item_becomes_assistant_message() {
        let items = vec![AgentItem::Model(ModelItem {
            content: vec![Part::text("hello")],
            usage: None,
            cost: None,
            input: LanguageModelInput::new(vec![]),
        })];
        let messages = items_to_messages(&items);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, vec![Part::text("hello")]);
    }

    #[test]
    fn contiguous_tool_items_pack_into_one_message() {
        let items = vec![
            AgentItem::Tool(ToolItem {
                tool_call_id: "call_1".to_string(),
                tool_name: "trade".to_string(),
                input: Value::Null,
                output: vec![Part::text("bought")],
                is_error: false,
            }),
            AgentItem::Tool(ToolItem {
                tool_call_id: "call_2".to_string(),
                tool_name: "trade".to_string(),
                input: Value::Null,
                output: vec![Part::text("sold")],
                is_error: false,
            }),
        ];
        let messages = items_to_messages(&items);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Tool);
        assert_eq!(messages[0].content.len(), 2);
    }

    #[test]
    fn non_contiguous_tool_items_pack_into_separate_messages() {
        let items = vec![
            AgentItem::Tool(ToolItem {
                tool_call_id: "call_1".to_string(),
                tool_name: "trade".to_string(),
                input: Value::Null,
                output: vec![Part::text("bought")],
                is_error: false,
            }),
            AgentItem::Message(Message::user(vec![Part::text("thanks")])),
            AgentItem::Tool(ToolItem {
                tool_call_id: "call_2".to_string(),
                tool_name: "trade".to_string(),
                input: Value::Null,
                output: vec![Part::text("sold")],
                is_error: false,
            }),
        ];
        let messages = items_to_messages(&items);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::Tool);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Tool);
    }
}
