use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::types::{ContentDelta, Part};

use super::items::AgentItem;

/// One delta forwarded from the current model call, as it arrives (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialEventData {
    pub delta: ContentDelta,
}

/// One finished [`AgentItem`] (a model call outcome or a tool execution
/// outcome), emitted as soon as it is produced (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEventData {
    pub item: AgentItem,
}

/// The terminal event of a Run (§6.3): every item produced and the final
/// assistant Parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEventData {
    pub output: Vec<AgentItem>,
    pub content: Vec<Part>,
}

/// Tagged event stream a Run emits while it executes (§6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    Partial(PartialEventData),
    Item(ItemEventData),
    Response(ResponseEventData),
}

/// Cooperative cancellation handle for a Run (§5, Cancellation).
///
/// Checked at each suspension point the Run loop passes through: before a
/// turn starts, while folding a model stream, and while a tool executes.
/// Cancelling guarantees in-flight tool executions are signalled and
/// awaited before the Run emits its final event.
#[derive(Clone)]
pub struct CancellationToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_cancelled_reflects_cancel_call() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn partial_event_serializes_with_type_tag() {
        let event = AgentStreamEvent::Partial(PartialEventData {
            delta: ContentDelta {
                index: 0,
                part: crate::types::PartDelta::Text(crate::types::TextPartDelta {
                    text: "hi".to_string(),
                    id: None,
                }),
            },
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "partial");
    }
}
