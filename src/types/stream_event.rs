use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ConversationRole, StopReason, StreamMetrics, TokenUsage};

/// The start of the assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageStartEvent {
    /// The role of the message being generated.
    pub role: ConversationRole,
}

/// The start of a content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockStartEvent {
    /// Index of the block within the message.
    pub content_block_index: u32,

    /// Block-specific start data (tool use blocks carry their id and name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Value>,
}

/// An incremental piece of a content block.
///
/// Only text deltas contribute to the visible reply.  The other members are
/// kept so they pass through unharmed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockDelta {
    /// A text fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// A fragment of tool-use input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<Value>,

    /// A fragment of reasoning content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<Value>,
}

impl ContentBlockDelta {
    /// A text delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

/// A delta for the content block at `content_block_index`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockDeltaEvent {
    /// Index of the block within the message.
    pub content_block_index: u32,

    /// The delta itself.
    pub delta: ContentBlockDelta,
}

/// The end of a content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlockStopEvent {
    /// Index of the block within the message.
    pub content_block_index: u32,
}

/// The end of the assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageStopEvent {
    /// Why generation stopped.
    pub stop_reason: StopReason,

    /// Model-specific response fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_model_response_fields: Option<Value>,
}

/// Usage and latency, sent after the message stops.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataEvent {
    /// Token counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,

    /// Latency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<StreamMetrics>,
}

/// One event of a Converse Stream response.
///
/// On the wire each event is a separate frame whose `:event-type` header names
/// the variant; in JSON form the event type is the outer key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ConverseStreamEvent {
    /// The assistant message has started.
    MessageStart(MessageStartEvent),

    /// A content block has started.
    ContentBlockStart(ContentBlockStartEvent),

    /// A content block has grown.
    ContentBlockDelta(ContentBlockDeltaEvent),

    /// A content block has finished.
    ContentBlockStop(ContentBlockStopEvent),

    /// The assistant message has finished.
    MessageStop(MessageStopEvent),

    /// Usage and latency for the response.
    Metadata(MetadataEvent),
}

impl ConverseStreamEvent {
    /// Parse an event from its `:event-type` and JSON payload.
    pub fn from_parts(event_type: &str, payload: &[u8]) -> serde_json::Result<Self> {
        let payload: Value = if payload.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_slice(payload)?
        };
        let mut object = serde_json::Map::new();
        object.insert(event_type.to_string(), payload);
        serde_json::from_value(Value::Object(object))
    }

    /// The event type name as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            ConverseStreamEvent::MessageStart(_) => "messageStart",
            ConverseStreamEvent::ContentBlockStart(_) => "contentBlockStart",
            ConverseStreamEvent::ContentBlockDelta(_) => "contentBlockDelta",
            ConverseStreamEvent::ContentBlockStop(_) => "contentBlockStop",
            ConverseStreamEvent::MessageStop(_) => "messageStop",
            ConverseStreamEvent::Metadata(_) => "metadata",
        }
    }

    /// Build a text delta event.
    pub fn text_delta(content_block_index: u32, text: impl Into<String>) -> Self {
        ConverseStreamEvent::ContentBlockDelta(ContentBlockDeltaEvent {
            content_block_index,
            delta: ContentBlockDelta::text(text),
        })
    }

    /// Build a message stop event.
    pub fn message_stop(stop_reason: StopReason) -> Self {
        ConverseStreamEvent::MessageStop(MessageStopEvent {
            stop_reason,
            additional_model_response_fields: None,
        })
    }

    /// Build a metadata event.
    pub fn metadata(usage: Option<TokenUsage>, metrics: Option<StreamMetrics>) -> Self {
        ConverseStreamEvent::Metadata(MetadataEvent { usage, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_text_delta() {
        let event = ConverseStreamEvent::from_parts(
            "contentBlockDelta",
            br#"{"contentBlockIndex":0,"delta":{"text":"Hel"},"p":"abcd"}"#,
        )
        .unwrap();
        assert_eq!(event, ConverseStreamEvent::text_delta(0, "Hel"));
        assert_eq!(event.event_type(), "contentBlockDelta");
    }

    #[test]
    fn parse_message_stop() {
        let event = ConverseStreamEvent::from_parts("messageStop", br#"{"stopReason":"max_tokens"}"#)
            .unwrap();
        assert_eq!(event, ConverseStreamEvent::message_stop(StopReason::MaxTokens));
    }

    #[test]
    fn parse_metadata() {
        let event = ConverseStreamEvent::from_parts(
            "metadata",
            br#"{"usage":{"inputTokens":5,"outputTokens":2,"totalTokens":7},"metrics":{"latencyMs":321}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ConverseStreamEvent::metadata(Some(TokenUsage::new(5, 2)), Some(StreamMetrics::new(321)))
        );
    }

    #[test]
    fn non_text_deltas_pass_through() {
        let event: ConverseStreamEvent = serde_json::from_value(json!({
            "contentBlockDelta": {
                "contentBlockIndex": 1,
                "delta": {"toolUse": {"input": "{\"a\":"}}
            }
        }))
        .unwrap();
        match event {
            ConverseStreamEvent::ContentBlockDelta(delta) => {
                assert!(delta.delta.text.is_none());
                assert!(delta.delta.tool_use.is_some());
            }
            _ => panic!("expected a delta"),
        }
    }

    #[test]
    fn unknown_event_type_is_an_error() {
        assert!(ConverseStreamEvent::from_parts("somethingElse", b"{}").is_err());
    }
}
