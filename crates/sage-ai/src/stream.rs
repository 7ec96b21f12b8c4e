//! Streaming event types and message assembly

use crate::error::{Error, Result};
use crate::types::{AssistantMetadata, Content, Message, Provider, StopReason, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a completion streams in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Text content delta
    TextDelta { delta: String },
    /// Fragment of a tool call. `id` and `name` arrive once, usually on the
    /// first fragment for an index; `arguments` is partial JSON.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: String,
    },
    /// Completion finished
    Done {
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred mid-stream
    Error { message: String },
}

impl MessageEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done { .. } | MessageEvent::Error { .. })
    }
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments_json: String,
}

/// Accumulates streaming events into one assistant message
#[derive(Debug, Default)]
pub struct MessageBuilder {
    text: String,
    tool_calls: Vec<PendingToolCall>,
    usage: Usage,
    stop_reason: Option<StopReason>,
    provider: Option<Provider>,
    model: Option<String>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which model produced the message
    pub fn with_origin(mut self, provider: Provider, model: impl Into<String>) -> Self {
        self.provider = Some(provider);
        self.model = Some(model.into());
        self
    }

    pub fn process_event(&mut self, event: &MessageEvent) {
        match event {
            MessageEvent::TextDelta { delta } => self.text.push_str(delta),
            MessageEvent::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            } => {
                while self.tool_calls.len() <= *index {
                    self.tool_calls.push(PendingToolCall::default());
                }
                let pending = &mut self.tool_calls[*index];
                if let Some(id) = id {
                    pending.id = id.clone();
                }
                if let Some(name) = name {
                    pending.name = name.clone();
                }
                pending.arguments_json.push_str(arguments);
            }
            MessageEvent::Done { stop_reason, usage } => {
                self.stop_reason = Some(*stop_reason);
                self.usage = usage.clone();
            }
            MessageEvent::Error { .. } => {}
        }
    }

    /// Whether any content has arrived yet
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.tool_calls.is_empty()
    }

    /// Build the final message.
    ///
    /// Tool call fragments that never received a name are dropped; arguments
    /// that fail to parse become an empty object.
    pub fn build(self) -> Message {
        let mut content = Vec::new();
        if !self.text.is_empty() {
            content.push(Content::Text { text: self.text });
        }
        for call in self.tool_calls {
            if call.name.is_empty() {
                continue;
            }
            let arguments = if call.arguments_json.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&call.arguments_json).unwrap_or(serde_json::json!({}))
            };
            content.push(Content::ToolCall {
                id: call.id,
                name: call.name,
                arguments,
            });
        }

        Message::Assistant {
            content,
            metadata: AssistantMetadata {
                provider: self.provider,
                model: self.model,
                usage: self.usage,
                stop_reason: self.stop_reason,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
        }
    }
}

/// Drain a stream into a single assistant message.
pub async fn collect_message(
    mut stream: MessageEventStream,
    mut builder: MessageBuilder,
) -> Result<Message> {
    while let Some(event) = stream.next().await {
        if let MessageEvent::Error { message } = &event {
            return Err(Error::Sse(message.clone()));
        }
        let done = event.is_terminal();
        builder.process_event(&event);
        if done {
            break;
        }
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(events: Vec<MessageEvent>) -> MessageEventStream {
        Box::pin(futures::stream::iter(events))
    }

    #[test]
    fn test_builder_assembles_text() {
        let mut b = MessageBuilder::new();
        b.process_event(&MessageEvent::TextDelta { delta: "Par".into() });
        b.process_event(&MessageEvent::TextDelta { delta: "is".into() });
        let msg = b.build();
        assert_eq!(msg.text(), "Paris");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_builder_assembles_fragmented_tool_calls() {
        let mut b = MessageBuilder::new();
        b.process_event(&MessageEvent::ToolCallDelta {
            index: 0,
            id: Some("call_1".into()),
            name: Some("wikipedia".into()),
            arguments: "{\"que".into(),
        });
        b.process_event(&MessageEvent::ToolCallDelta {
            index: 1,
            id: Some("call_2".into()),
            name: Some("arxiv".into()),
            arguments: "{}".into(),
        });
        b.process_event(&MessageEvent::ToolCallDelta {
            index: 0,
            id: None,
            name: None,
            arguments: "ry\": \"France\"}".into(),
        });
        let calls = b.build().tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "wikipedia");
        assert_eq!(calls[0].arguments["query"], "France");
        assert_eq!(calls[1].id, "call_2");
    }

    #[test]
    fn test_builder_drops_nameless_calls_and_bad_json() {
        let mut b = MessageBuilder::new();
        b.process_event(&MessageEvent::ToolCallDelta {
            index: 1,
            id: Some("c".into()),
            name: Some("web_search".into()),
            arguments: "{not json".into(),
        });
        let calls = b.build().tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_collect_message_records_usage() {
        let stream = boxed(vec![
            MessageEvent::TextDelta { delta: "hi".into() },
            MessageEvent::Done {
                stop_reason: StopReason::Stop,
                usage: Usage { input: 10, output: 2 },
            },
        ]);
        let msg = collect_message(stream, MessageBuilder::new().with_origin(Provider::Groq, "m"))
            .await
            .unwrap();
        assert_eq!(msg.text(), "hi");
        assert_eq!(msg.usage(), Some(&Usage { input: 10, output: 2 }));
    }

    #[tokio::test]
    async fn test_collect_message_surfaces_stream_error() {
        let stream = boxed(vec![
            MessageEvent::TextDelta { delta: "partial".into() },
            MessageEvent::Error {
                message: "connection reset".into(),
            },
        ]);
        let err = collect_message(stream, MessageBuilder::new()).await.unwrap_err();
        assert!(matches!(err, Error::Sse(_)));
    }
}
