//! HttpAgentService - REST client for the remote agent service.
//!
//! Every send carries the caller's idempotency key; transport-level retries
//! reuse it, so the service can collapse duplicates into one effect.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use parley_core::exchange::{SendRequest, SendResponse};
use parley_core::history::{HistoryPage, HistoryQuery};
use parley_core::ports::{AgentService, ChunkStream};
use parley_core::session::{AgentSummary, Identity, MemoryBlock, ServiceDefaults};
use parley_core::{ClientConfig, ParleyError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::ndjson::decode_stream;
use crate::wire::{AuthStatusBody, ChatRequestBody, ChatResponseBody, MemoryBody};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Agent service reached over HTTP.
#[derive(Clone)]
pub struct HttpAgentService {
    client: Client,
    base_url: Url,
    max_send_retries: u32,
}

/// Maps a reqwest failure into the client error taxonomy.
pub(crate) fn transport_error(context: &str, e: reqwest::Error) -> ParleyError {
    if e.is_decode() {
        return ParleyError::Serialization {
            format: "JSON".to_string(),
            message: format!("{context}: {e}"),
        };
    }
    match e.status() {
        Some(status) => ParleyError::http_status(status.as_u16(), format!("{context}: {e}")),
        None => ParleyError::transport(format!("{context}: {e}")),
    }
}

/// Fails on a non-success status, keeping the body text for the message.
pub(crate) async fn check_status(context: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ParleyError::http_status(
        status.as_u16(),
        format!("{context}: {error_text}"),
    ))
}

impl HttpAgentService {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ParleyError::config(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(client, &config.normalized_base_url(), config.max_send_retries)
    }

    pub fn with_client(client: Client, base_url: &str, max_send_retries: u32) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ParleyError::config(format!("Invalid base URL '{base_url}': {e}")))?;
        Ok(Self {
            client,
            base_url,
            max_send_retries,
        })
    }

    /// Joins path segments onto the base URL, percent-encoding each.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ParleyError::config(format!("Base URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, context: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;
        check_status(context, response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| transport_error(context, e))
    }

    fn chat_request(&self, request: &SendRequest, progressive: bool) -> Result<RequestBuilder> {
        let mut url = self.endpoint(&["api", "chat"])?;
        if progressive {
            url.query_pairs_mut().append_pair("stream", "true");
        }
        let mut builder = self.client.post(url).json(&ChatRequestBody::from(request));
        if progressive {
            builder = builder.header(reqwest::header::ACCEPT, "application/x-ndjson");
        }
        Ok(builder)
    }

    async fn send_once(&self, request: &SendRequest) -> Result<SendResponse> {
        let context = "Chat request failed";
        let response = self
            .chat_request(request, false)?
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;

        let accepted = response.status() == StatusCode::ACCEPTED;
        let body: ChatResponseBody = check_status(context, response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(context, e))?;

        if accepted || body.is_in_flight() {
            return Ok(SendResponse::InFlight);
        }
        Ok(SendResponse::Messages(body.messages))
    }

    async fn open_stream_once(&self, request: &SendRequest) -> Result<ChunkStream> {
        let context = "Streaming chat request failed";
        let response = self
            .chat_request(request, true)?
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;
        let response = check_status(context, response).await?;

        let bytes = response
            .bytes_stream()
            .map_err(|e| transport_error("Stream interrupted", e))
            .boxed();
        Ok(decode_stream(bytes))
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retry
    /// budget is spent. Callers pass closures that reuse the same key.
    async fn with_retries<T, F, Fut>(&self, key: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut tries = 0;
        loop {
            match attempt().await {
                Err(e) if e.is_retryable() && tries < self.max_send_retries => {
                    tries += 1;
                    let delay = RETRY_BASE_DELAY * 2u32.pow(tries - 1);
                    tracing::warn!(
                        "[HTTP] Send {} failed ({}), retry {}/{} in {:?}",
                        key,
                        e,
                        tries,
                        self.max_send_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn health(&self) -> Result<()> {
        let url = self.endpoint(&["api", "health"])?;
        let _: serde_json::Value = self
            .get_json("Health check failed", self.client.get(url))
            .await?;
        Ok(())
    }

    async fn defaults(&self) -> Result<ServiceDefaults> {
        let url = self.endpoint(&["api", "config"])?;
        self.get_json("Failed to load service configuration", self.client.get(url))
            .await
    }

    async fn identity(&self) -> Result<Identity> {
        let context = "Failed to query auth status";
        let url = self.endpoint(&["auth", "status"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;

        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED
        ) {
            return Ok(Identity::NotConfigured);
        }

        let body: AuthStatusBody = check_status(context, response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error(context, e))?;
        Ok(match (body.authenticated, body.user) {
            (true, Some(user)) => Identity::Authenticated(user),
            _ => Identity::Anonymous,
        })
    }

    async fn list_agents(&self, project_id: Option<&str>) -> Result<Vec<AgentSummary>> {
        let url = self.endpoint(&["api", "agents"])?;
        let mut request = self.client.get(url);
        if let Some(project_id) = project_id {
            request = request.query(&[("project_id", project_id)]);
        }
        self.get_json("Failed to list agents", request).await
    }

    async fn memory(&self, agent_id: &str, project_id: Option<&str>) -> Result<Vec<MemoryBlock>> {
        let url = self.endpoint(&["api", "agents", agent_id, "memory"])?;
        let mut request = self.client.get(url);
        if let Some(project_id) = project_id {
            request = request.query(&[("project_id", project_id)]);
        }
        let body: MemoryBody = self.get_json("Failed to load agent memory", request).await?;
        Ok(body.into_blocks())
    }

    async fn send(&self, request: &SendRequest) -> Result<SendResponse> {
        self.with_retries(&request.idempotency_key, || self.send_once(request))
            .await
    }

    async fn send_progressive(&self, request: &SendRequest) -> Result<ChunkStream> {
        self.with_retries(&request.idempotency_key, || self.open_stream_once(request))
            .await
    }

    async fn history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        let url = self.endpoint(&["api", "agents", &query.session.agent_id, "messages"])?;
        let mut params: Vec<(&str, String)> = vec![("limit", query.limit.to_string())];
        if let Some(before) = &query.before {
            params.push(("before", before.clone()));
        }
        if let Some(project_id) = &query.session.project_id {
            params.push(("project_id", project_id.clone()));
        }
        self.get_json("Failed to load history", self.client.get(url).query(&params))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpAgentService {
        HttpAgentService::with_client(Client::new(), base, 0).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let service = service("http://localhost:8000");
        let url = service
            .endpoint(&["api", "agents", "agent/with space", "messages"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/agents/agent%2Fwith%20space/messages"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let service = service("https://example.com/parley/");
        let url = service.endpoint(&["api", "health"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/parley/api/health");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpAgentService::with_client(Client::new(), "not a url", 0).err().unwrap();
        assert!(matches!(err, ParleyError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_retryable_transport_error() {
        // Port 9 (discard) is closed on test machines.
        let service = service("http://127.0.0.1:9");
        let err = service.health().await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.is_retryable());
    }
}
