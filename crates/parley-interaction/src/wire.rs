//! Request and response bodies of the agent service's HTTP API.

use parley_core::exchange::SendRequest;
use parley_core::message::AgentMessage;
use parley_core::ports::DiagnosticEntry;
use parley_core::session::{MemoryBlock, UserDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestBody<'a> {
    pub agent_id: &'a str,
    pub message: &'a str,
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<&'a str>,
    pub idempotency_key: &'a str,
    pub verbose: bool,
}

impl<'a> From<&'a SendRequest> for ChatRequestBody<'a> {
    fn from(request: &'a SendRequest) -> Self {
        Self {
            agent_id: &request.session.agent_id,
            message: &request.text,
            role: "user",
            project_id: request.session.project_id.as_deref(),
            idempotency_key: &request.idempotency_key,
            verbose: request.verbose,
        }
    }
}

/// Body of a 200/202 answer to `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseBody {
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ChatResponseBody {
    pub fn is_in_flight(&self) -> bool {
        self.status.as_deref() == Some("in_flight")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthStatusBody {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<UserDescriptor>,
}

/// Answer of `GET /api/agents/{id}/memory`.
///
/// Deployments answer with a block list, a `{ "blocks": [...] }` wrapper, or
/// a plain `label -> value` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MemoryBody {
    Blocks(Vec<MemoryBlock>),
    Wrapped { blocks: Vec<MemoryBlock> },
    Labelled(serde_json::Map<String, serde_json::Value>),
}

impl MemoryBody {
    pub fn into_blocks(self) -> Vec<MemoryBlock> {
        match self {
            Self::Blocks(blocks) | Self::Wrapped { blocks } => blocks,
            Self::Labelled(map) => map
                .into_iter()
                .map(|(label, value)| match value {
                    serde_json::Value::String(text) => MemoryBlock::new(label, text),
                    other => MemoryBlock::new(label, other.to_string()),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LogBatchBody<'a> {
    pub logs: &'a [DiagnosticEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::session::ConversationSession;

    #[test]
    fn test_chat_body_shape() {
        let request = SendRequest {
            session: ConversationSession::new("agent-1", Some("proj")).unwrap(),
            text: "Hi".to_string(),
            idempotency_key: "k-1".to_string(),
            verbose: true,
        };
        let body = serde_json::to_value(ChatRequestBody::from(&request)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "agent_id": "agent-1",
                "message": "Hi",
                "role": "user",
                "project_id": "proj",
                "idempotency_key": "k-1",
                "verbose": true
            })
        );
    }

    #[test]
    fn test_memory_body_shapes() {
        let list: MemoryBody =
            serde_json::from_str(r#"[{"label":"persona","value":"helpful","limit":2000}]"#).unwrap();
        let blocks = list.into_blocks();
        assert_eq!(blocks[0].label, "persona");
        assert_eq!(blocks[0].limit, Some(2000));

        let wrapped: MemoryBody =
            serde_json::from_str(r#"{"blocks":[{"label":"human","value":"Sam"}]}"#).unwrap();
        assert_eq!(wrapped.into_blocks(), vec![MemoryBlock::new("human", "Sam")]);

        let labelled: MemoryBody = serde_json::from_str(r#"{"persona":"terse","turns":3}"#).unwrap();
        let blocks = labelled.into_blocks();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.contains(&MemoryBlock::new("persona", "terse")));
        assert!(blocks.contains(&MemoryBlock::new("turns", "3")));
    }

    #[test]
    fn test_in_flight_body() {
        let body: ChatResponseBody = serde_json::from_str(r#"{"status":"in_flight"}"#).unwrap();
        assert!(body.is_in_flight());
        assert!(body.messages.is_empty());
    }
}
