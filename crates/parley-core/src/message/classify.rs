//! Message classification.
//!
//! Decides which transcript entry (if any) a message becomes. The agent's
//! reply is always shown; reasoning and tool traffic only in verbose mode;
//! every other kind is dropped.

use crate::transcript::{EntryDraft, EntryRole};

use super::model::AgentMessage;

/// Where a message came from. User turns are rendered from history but not
/// from a live reply, where they only echo what the client already shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    Live,
    History,
}

/// Converts one message into a transcript draft.
///
/// Returns `None` for hidden or dropped kinds and for messages whose display
/// text is empty.
pub fn to_draft(message: &AgentMessage, verbose: bool, origin: MessageOrigin) -> Option<EntryDraft> {
    let (role, text) = match message {
        AgentMessage::Assistant { content, .. } => (EntryRole::Agent, content.display_text()),
        AgentMessage::Reasoning { reasoning, .. } if verbose => {
            (EntryRole::DebugReasoning, reasoning.trim().to_string())
        }
        AgentMessage::ToolCall { call, .. } if verbose => (
            EntryRole::DebugToolCall,
            format!("{}({})", call.name, call.arguments.trim()),
        ),
        AgentMessage::ToolReturn {
            tool_return,
            status,
            ..
        } if verbose => {
            let text = match status.as_deref() {
                Some(status) if status != "success" => format!("[{status}] {}", tool_return.trim()),
                _ => tool_return.trim().to_string(),
            };
            (EntryRole::DebugToolResult, text)
        }
        AgentMessage::User { content, .. } if origin == MessageOrigin::History => {
            (EntryRole::User, content.display_text())
        }
        AgentMessage::Reasoning { .. }
        | AgentMessage::ToolCall { .. }
        | AgentMessage::ToolReturn { .. }
        | AgentMessage::User { .. }
        | AgentMessage::System { .. }
        | AgentMessage::UsageStatistics { .. }
        | AgentMessage::StopReason { .. } => return None,
        AgentMessage::Unknown { message_type, id } => {
            tracing::warn!(
                "[Messages] Dropping message with unrecognized kind '{}' (id: {:?})",
                message_type,
                id
            );
            return None;
        }
    };

    if text.trim().is_empty() {
        return None;
    }

    Some(EntryDraft::new(role, text).with_id(message.id().map(str::to_string)))
}

/// Classifies a batch, preserving order and dropping non-renderable messages.
pub fn render_messages(messages: &[AgentMessage], verbose: bool, origin: MessageOrigin) -> Vec<EntryDraft> {
    messages
        .iter()
        .filter_map(|m| to_draft(m, verbose, origin))
        .collect()
}
