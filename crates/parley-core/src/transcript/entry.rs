//! Transcript entry types.

use serde::{Deserialize, Serialize};

/// Locally assigned, buffer-unique entry handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u64);

/// Represents the role of a rendered transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    /// Message composed by the user.
    User,
    /// User-facing reply from the agent.
    Agent,
    /// Client-generated notice (errors, hints, placeholders).
    System,
    /// Transient "Thinking..." placeholder for an in-flight submission.
    Loading,
    /// Agent internal reasoning (verbose mode only).
    DebugReasoning,
    /// Tool invocation with name and arguments (verbose mode only).
    DebugToolCall,
    /// Tool result (verbose mode only).
    DebugToolResult,
}

impl EntryRole {
    /// Whether entries of this role are only shown in verbose mode.
    pub fn is_debug(&self) -> bool {
        matches!(
            self,
            Self::DebugReasoning | Self::DebugToolCall | Self::DebugToolResult
        )
    }
}

/// Where an entry was inserted relative to the existing log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPosition {
    /// Added at the live tail.
    Append,
    /// Inserted above the head (history).
    Prepend,
}

/// A single rendered entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub local_id: EntryId,
    /// Identifier assigned by the agent service, when known.
    pub id: Option<String>,
    pub role: EntryRole,
    pub text: String,
    pub position: EntryPosition,
}

/// An entry that has not been placed in a buffer yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub id: Option<String>,
    pub role: EntryRole,
    pub text: String,
}

impl EntryDraft {
    pub fn new(role: EntryRole, text: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            text: text.into(),
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }
}
