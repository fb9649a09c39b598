//! Diagnostic sink port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One structured log record as shipped to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    /// Component tag, e.g. `Speech` for a `[Speech] ...` message.
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// Receives batched diagnostic entries.
///
/// Delivery is best effort: callers log and drop failures.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn submit(&self, entries: &[DiagnosticEntry], session_id: Option<&str>) -> Result<()>;
}
