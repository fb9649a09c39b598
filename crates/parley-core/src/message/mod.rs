//! Agent message domain module.
//!
//! # Module Structure
//!
//! - `model`: the closed set of message kinds the agent service emits
//!   (`AgentMessage`, `MessageContent`, `ToolCall`)
//! - `classify`: mapping from messages to transcript drafts by context and
//!   verbose mode

mod classify;
mod model;

// Re-export public API
pub use classify::{MessageOrigin, render_messages, to_draft};
pub use model::{AgentMessage, ContentPart, MessageContent, MessageKind, ToolCall};
