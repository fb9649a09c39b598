//! Agent service port.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::exchange::{SendRequest, SendResponse, StreamChunk};
use crate::history::{HistoryPage, HistoryQuery};
use crate::session::{AgentSummary, Identity, MemoryBlock, ServiceDefaults};

/// Progressive response: chunks in arrival order. The stream ends when the
/// connection closes.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

/// The remote conversational-agent service.
///
/// The controller never sees the transport; HTTP and in-memory backends
/// both implement this trait.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Liveness check.
    async fn health(&self) -> Result<()>;

    /// Default agent/project configured on the service.
    async fn defaults(&self) -> Result<ServiceDefaults>;

    /// Current user. A service without authentication answers
    /// `Identity::NotConfigured` rather than an error.
    async fn identity(&self) -> Result<Identity>;

    /// Agents available within an optional project scope.
    async fn list_agents(&self, project_id: Option<&str>) -> Result<Vec<AgentSummary>>;

    /// Memory blocks of one agent, in the order the service keeps them.
    async fn memory(&self, agent_id: &str, project_id: Option<&str>) -> Result<Vec<MemoryBlock>>;

    /// Sends one message and waits for the whole answer.
    async fn send(&self, request: &SendRequest) -> Result<SendResponse>;

    /// Sends one message and returns the progressive chunk stream.
    async fn send_progressive(&self, request: &SendRequest) -> Result<ChunkStream>;

    /// One page of history, newest first.
    async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage>;
}
