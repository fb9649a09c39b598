//! Request and response value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::AgentMessage;
use crate::session::{ConversationSession, Epoch};

/// One logical send, as handed to the agent service.
///
/// Retries of the same logical attempt reuse the same `idempotency_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub session: ConversationSession,
    pub text: String,
    pub idempotency_key: String,
    pub verbose: bool,
}

/// Terminal answer to an atomic send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResponse {
    /// Ordered messages produced by the agent.
    Messages(Vec<AgentMessage>),
    /// The key is still being processed by an earlier request. Wait, do not
    /// resend as new.
    InFlight,
}

/// One line of a progressive response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    Chunk { message: AgentMessage },
    Done,
    InFlight,
    Error { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    InFlight,
    Completed,
    Failed,
}

/// The single submission a controller may have outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub request: SendRequest,
    pub submitted_at: DateTime<Utc>,
    pub status: RequestStatus,
    /// Session epoch at submission; results from an older epoch are dropped.
    pub epoch: Epoch,
}

impl PendingRequest {
    pub fn key(&self) -> &str {
        &self.request.idempotency_key
    }

    pub fn composed_text(&self) -> &str {
        &self.request.text
    }
}
