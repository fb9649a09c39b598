//! LoopbackAgentService - in-process echo agent.
//!
//! Implements the agent service contract without a network: replies echo the
//! user's text, history is kept in memory per session, and idempotency keys
//! are honored through an [`IdempotencyLedger`]. Used by `parley chat
//! --offline` and by tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::exchange::{Admission, IdempotencyLedger, SendRequest, SendResponse, StreamChunk};
use parley_core::history::{HistoryPage, HistoryQuery};
use parley_core::message::AgentMessage;
use parley_core::ports::{AgentService, ChunkStream};
use parley_core::session::{AgentSummary, ConversationSession, Identity, MemoryBlock, ServiceDefaults};
use parley_core::{ParleyError, Result};
use tokio::sync::Mutex;

pub const LOOPBACK_AGENT_ID: &str = "echo";

#[derive(Default)]
struct LoopbackState {
    /// Oldest first.
    conversations: HashMap<ConversationSession, Vec<AgentMessage>>,
    ledger: IdempotencyLedger<Vec<AgentMessage>>,
    next_id: u64,
    effects: usize,
}

impl LoopbackState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("msg-{}", self.next_id)
    }

    fn reply_to(&mut self, text: &str) -> Vec<AgentMessage> {
        vec![
            AgentMessage::user(self.next_id(), text),
            AgentMessage::reasoning(
                self.next_id(),
                format!("The user wrote {} characters; echoing them back.", text.chars().count()),
            ),
            AgentMessage::assistant(self.next_id(), format!("You said: {text}")),
        ]
    }
}

pub struct LoopbackAgentService {
    state: Mutex<LoopbackState>,
    agents: Vec<AgentSummary>,
    reply_delay: Duration,
}

impl Default for LoopbackAgentService {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackAgentService {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoopbackState::default()),
            agents: vec![AgentSummary {
                id: LOOPBACK_AGENT_ID.to_string(),
                name: Some("Echo".to_string()),
                created_at: None,
            }],
            reply_delay: Duration::ZERO,
        }
    }

    /// Holds each fresh send for `delay` before answering, so concurrent
    /// resends of the same key observe it in flight.
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Adds stored messages (oldest first) to a session's history.
    pub async fn seed_history(&self, session: &ConversationSession, messages: Vec<AgentMessage>) {
        let mut state = self.state.lock().await;
        state
            .conversations
            .entry(session.clone())
            .or_default()
            .extend(messages);
    }

    /// Number of sends that actually produced a reply.
    pub async fn effect_count(&self) -> usize {
        self.state.lock().await.effects
    }

    fn ensure_agent(&self, agent_id: &str) -> Result<()> {
        if self.agents.iter().any(|a| a.id == agent_id) {
            return Ok(());
        }
        Err(ParleyError::http_status(
            404,
            format!("Agent '{agent_id}' not found"),
        ))
    }

    async fn exchange(&self, request: &SendRequest) -> Result<SendResponse> {
        self.ensure_agent(&request.session.agent_id)?;

        let admission = self
            .state
            .lock()
            .await
            .ledger
            .begin(&request.idempotency_key);
        match admission {
            Admission::InFlight => return Ok(SendResponse::InFlight),
            Admission::Completed(messages) => {
                tracing::debug!("[Loopback] Replaying cached reply for {}", request.idempotency_key);
                return Ok(SendResponse::Messages(messages));
            }
            Admission::Fresh => {}
        }

        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }

        let mut state = self.state.lock().await;
        let reply = state.reply_to(&request.text);
        state.effects += 1;
        state
            .conversations
            .entry(request.session.clone())
            .or_default()
            .extend(reply.iter().cloned());

        let mut response = reply;
        response.push(AgentMessage::UsageStatistics { id: None });
        state
            .ledger
            .complete(&request.idempotency_key, response.clone());
        Ok(SendResponse::Messages(response))
    }
}

#[async_trait]
impl AgentService for LoopbackAgentService {
    async fn health(&self) -> Result<()> {
        Ok(())
    }

    async fn defaults(&self) -> Result<ServiceDefaults> {
        Ok(ServiceDefaults {
            default_agent_id: Some(LOOPBACK_AGENT_ID.to_string()),
            default_project_id: None,
        })
    }

    async fn identity(&self) -> Result<Identity> {
        Ok(Identity::NotConfigured)
    }

    async fn list_agents(&self, _project_id: Option<&str>) -> Result<Vec<AgentSummary>> {
        Ok(self.agents.clone())
    }

    async fn memory(&self, agent_id: &str, project_id: Option<&str>) -> Result<Vec<MemoryBlock>> {
        self.ensure_agent(agent_id)?;
        let stored = match ConversationSession::new(agent_id, project_id) {
            Some(session) => self
                .state
                .lock()
                .await
                .conversations
                .get(&session)
                .map_or(0, Vec::len),
            None => 0,
        };
        Ok(vec![
            MemoryBlock::new("persona", "I repeat back whatever I am told."),
            MemoryBlock::new("human", format!("{stored} messages in this conversation.")),
        ])
    }

    async fn send(&self, request: &SendRequest) -> Result<SendResponse> {
        self.exchange(request).await
    }

    async fn send_progressive(&self, request: &SendRequest) -> Result<ChunkStream> {
        let chunks: Vec<Result<StreamChunk>> = match self.exchange(request).await? {
            SendResponse::InFlight => vec![Ok(StreamChunk::InFlight)],
            SendResponse::Messages(messages) => messages
                .into_iter()
                .map(|message| Ok(StreamChunk::Chunk { message }))
                .chain(std::iter::once(Ok(StreamChunk::Done)))
                .collect(),
        };
        Ok(futures::stream::iter(chunks).boxed())
    }

    async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        let state = self.state.lock().await;
        let Some(messages) = state.conversations.get(&query.session) else {
            return Ok(HistoryPage::default());
        };

        let end = match &query.before {
            Some(before) => messages
                .iter()
                .position(|m| m.id() == Some(before.as_str()))
                .unwrap_or(0),
            None => messages.len(),
        };
        let start = end.saturating_sub(query.limit);
        let page = &messages[start..end];

        Ok(HistoryPage {
            messages: page.iter().rev().cloned().collect(),
            has_more: start > 0,
            oldest_id: page.first().and_then(AgentMessage::id).map(str::to_string),
        })
    }
}
