//! Diagnostic sink posting batches to `POST /api/logs`.

use async_trait::async_trait;
use parley_core::ports::{DiagnosticEntry, DiagnosticSink};
use parley_core::{ParleyError, Result};
use reqwest::{Client, Url};

use crate::http_agent_service::{check_status, transport_error};
use crate::wire::LogBatchBody;

#[derive(Clone)]
pub struct HttpDiagnosticSink {
    client: Client,
    url: Url,
}

impl HttpDiagnosticSink {
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let url = Url::parse(&format!("{}/api/logs", base_url.trim_end_matches('/')))
            .map_err(|e| ParleyError::config(format!("Invalid base URL '{base_url}': {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl DiagnosticSink for HttpDiagnosticSink {
    async fn submit(&self, entries: &[DiagnosticEntry], session_id: Option<&str>) -> Result<()> {
        let context = "Failed to ship diagnostics";
        let body = LogBatchBody {
            logs: entries,
            session_id,
        };
        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(context, e))?;
        check_status(context, response).await?;
        Ok(())
    }
}
