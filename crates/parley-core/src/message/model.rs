//! Conversation message types as emitted by the agent service.
//!
//! The wire format tags each message with `message_type`. Known tags map to
//! dedicated variants; anything else lands in [`AgentMessage::Unknown`] so
//! callers must handle it explicitly instead of falling through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A content part inside a multi-part message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub part_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Message body: either a plain string or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Text suitable for display; non-text parts are skipped.
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| p.part_type.as_deref().is_none_or(|t| t == "text"))
                .filter_map(|p| p.text.as_deref())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A tool invocation requested by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    /// Arguments as serialized JSON text.
    pub arguments: String,
}

/// Discriminant of [`AgentMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Assistant,
    Reasoning,
    ToolCall,
    ToolReturn,
    User,
    System,
    UsageStatistics,
    StopReason,
    Unknown,
}

/// A single message produced by the agent service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum AgentMessage {
    /// The agent's user-facing reply.
    Assistant {
        id: Option<String>,
        content: MessageContent,
    },
    /// Internal reasoning.
    Reasoning { id: Option<String>, reasoning: String },
    /// Tool invocation.
    ToolCall { id: Option<String>, call: ToolCall },
    /// Tool result.
    ToolReturn {
        id: Option<String>,
        tool_return: String,
        status: Option<String>,
    },
    /// A user turn (appears in history; echoed on live sends).
    User {
        id: Option<String>,
        content: MessageContent,
    },
    /// A system turn.
    System {
        id: Option<String>,
        content: MessageContent,
    },
    /// Token accounting for the exchange.
    UsageStatistics { id: Option<String> },
    /// Why the agent stopped.
    StopReason {
        id: Option<String>,
        reason: Option<String>,
    },
    /// A tag this client does not know, or a known tag with a malformed body.
    Unknown {
        id: Option<String>,
        message_type: String,
    },
}

impl AgentMessage {
    pub fn assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Assistant {
            id: Some(id.into()),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn reasoning(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Reasoning {
            id: Some(id.into()),
            reasoning: text.into(),
        }
    }

    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::User {
            id: Some(id.into()),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Assistant { .. } => MessageKind::Assistant,
            Self::Reasoning { .. } => MessageKind::Reasoning,
            Self::ToolCall { .. } => MessageKind::ToolCall,
            Self::ToolReturn { .. } => MessageKind::ToolReturn,
            Self::User { .. } => MessageKind::User,
            Self::System { .. } => MessageKind::System,
            Self::UsageStatistics { .. } => MessageKind::UsageStatistics,
            Self::StopReason { .. } => MessageKind::StopReason,
            Self::Unknown { .. } => MessageKind::Unknown,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Assistant { id, .. }
            | Self::Reasoning { id, .. }
            | Self::ToolCall { id, .. }
            | Self::ToolReturn { id, .. }
            | Self::User { id, .. }
            | Self::System { id, .. }
            | Self::UsageStatistics { id }
            | Self::StopReason { id, .. }
            | Self::Unknown { id, .. } => id.as_deref(),
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn content_field(value: &Value, key: &str) -> Option<MessageContent> {
    serde_json::from_value(value.get(key)?.clone()).ok()
}

impl From<Value> for AgentMessage {
    fn from(value: Value) -> Self {
        let id = string_field(&value, "id");
        let message_type = value
            .get("message_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let unknown = |id: Option<String>| AgentMessage::Unknown {
            id,
            message_type: message_type.clone(),
        };

        match message_type.as_str() {
            "assistant_message" => match content_field(&value, "content") {
                Some(content) => Self::Assistant { id, content },
                None => unknown(id),
            },
            "reasoning_message" => match string_field(&value, "reasoning") {
                Some(reasoning) => Self::Reasoning { id, reasoning },
                None => unknown(id),
            },
            "tool_call_message" => {
                let call = value.get("tool_call").and_then(|call| {
                    Some(ToolCall {
                        name: string_field(call, "name")?,
                        arguments: string_field(call, "arguments").unwrap_or_default(),
                    })
                });
                match call {
                    Some(call) => Self::ToolCall { id, call },
                    None => unknown(id),
                }
            }
            "tool_return_message" => Self::ToolReturn {
                id,
                tool_return: string_field(&value, "tool_return").unwrap_or_default(),
                status: string_field(&value, "status"),
            },
            "user_message" => Self::User {
                id,
                content: content_field(&value, "content").unwrap_or_default(),
            },
            "system_message" => Self::System {
                id,
                content: content_field(&value, "content").unwrap_or_default(),
            },
            "usage_statistics" => Self::UsageStatistics { id },
            "stop_reason" => Self::StopReason {
                id,
                reason: string_field(&value, "stop_reason"),
            },
            _ => unknown(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_kinds() {
        let messages: Vec<AgentMessage> = serde_json::from_str(
            r#"[
                {"id": "m1", "message_type": "reasoning_message", "reasoning": "User greets me."},
                {"id": "m2", "message_type": "tool_call_message",
                 "tool_call": {"name": "search", "arguments": "{\"q\":\"rust\"}"}},
                {"id": "m3", "message_type": "tool_return_message", "tool_return": "3 hits", "status": "success"},
                {"id": "m4", "message_type": "assistant_message", "content": "Hello!"},
                {"message_type": "usage_statistics", "total_tokens": 120}
            ]"#,
        )
        .unwrap();

        let kinds: Vec<MessageKind> = messages.iter().map(AgentMessage::kind).collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::Reasoning,
                MessageKind::ToolCall,
                MessageKind::ToolReturn,
                MessageKind::Assistant,
                MessageKind::UsageStatistics,
            ]
        );
        assert_eq!(messages[3], AgentMessage::assistant("m4", "Hello!"));
        match &messages[1] {
            AgentMessage::ToolCall { call, .. } => {
                assert_eq!(call.name, "search");
                assert_eq!(call.arguments, r#"{"q":"rust"}"#);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let message: AgentMessage =
            serde_json::from_str(r#"{"id": "x", "message_type": "hidden_memory_edit"}"#).unwrap();
        assert_eq!(
            message,
            AgentMessage::Unknown {
                id: Some("x".to_string()),
                message_type: "hidden_memory_edit".to_string(),
            }
        );
    }

    #[test]
    fn test_multipart_content_display_text() {
        let message: AgentMessage = serde_json::from_str(
            r#"{"message_type": "assistant_message",
                "content": [{"type": "text", "text": "first"}, {"type": "image"}, {"type": "text", "text": " second "}]}"#,
        )
        .unwrap();
        match message {
            AgentMessage::Assistant { content, .. } => {
                assert_eq!(content.display_text(), "first\nsecond");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
