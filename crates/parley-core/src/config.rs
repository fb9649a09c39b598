//! Client configuration model.
//!
//! `ClientConfig` is deserialized from `config.toml`; every field has a
//! default so a partial (or missing) file is valid. Loading and environment
//! overrides live in `parley_infrastructure::config_service`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the agent service delivers the reply to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// One response payload carrying the full ordered message list.
    #[default]
    Atomic,
    /// A stream of typed chunks terminated by `done`.
    Progressive,
}

impl std::str::FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(Self::Atomic),
            "progressive" | "stream" | "streaming" => Ok(Self::Progressive),
            other => Err(format!("unknown delivery mode '{other}'")),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DiagnosticsSettings {
    pub enabled: bool,
    pub flush_interval_ms: u64,
    pub max_batch: usize,
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_interval_ms: 5_000,
            max_batch: 50,
        }
    }
}

impl DiagnosticsSettings {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// Root configuration for a Parley client.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the agent service (no trailing slash).
    pub base_url: String,
    pub delivery_mode: DeliveryMode,
    /// Number of history entries requested per page.
    pub page_size: usize,
    /// Distance from the top edge (in pixels) that counts as "near the top".
    pub scroll_threshold_px: f64,
    pub scroll_cooldown_ms: u64,
    /// Quiet period before a manually typed agent identifier is applied.
    pub agent_id_debounce_ms: u64,
    pub max_recording_secs: u64,
    pub speech_retry_delay_ms: u64,
    /// How long the platform may take to confirm a start before giving up.
    pub speech_start_timeout_ms: u64,
    /// Delay before re-sending a request the server reported as in flight.
    pub in_flight_poll_ms: u64,
    pub request_timeout_secs: u64,
    /// Transport-level retries per send, always with the same idempotency key.
    pub max_send_retries: u32,
    pub diagnostics: DiagnosticsSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            delivery_mode: DeliveryMode::Atomic,
            page_size: 10,
            scroll_threshold_px: 50.0,
            scroll_cooldown_ms: 500,
            agent_id_debounce_ms: 500,
            max_recording_secs: 60,
            speech_retry_delay_ms: 100,
            speech_start_timeout_ms: 5_000,
            in_flight_poll_ms: 1_500,
            request_timeout_secs: 120,
            max_send_retries: 2,
            diagnostics: DiagnosticsSettings::default(),
        }
    }
}

impl ClientConfig {
    pub fn scroll_cooldown(&self) -> Duration {
        Duration::from_millis(self.scroll_cooldown_ms)
    }

    pub fn agent_id_debounce(&self) -> Duration {
        Duration::from_millis(self.agent_id_debounce_ms)
    }

    pub fn max_recording(&self) -> Duration {
        Duration::from_secs(self.max_recording_secs)
    }

    pub fn speech_retry_delay(&self) -> Duration {
        Duration::from_millis(self.speech_retry_delay_ms)
    }

    pub fn speech_start_timeout(&self) -> Duration {
        Duration::from_millis(self.speech_start_timeout_ms)
    }

    pub fn in_flight_poll(&self) -> Duration {
        Duration::from_millis(self.in_flight_poll_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL with any trailing slash removed.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }
}
