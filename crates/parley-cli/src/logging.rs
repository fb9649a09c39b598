//! Tracing setup for the `parley` binary.

use std::sync::Arc;

use anyhow::Result;
use parley_core::ClientConfig;
use parley_diagnostics::{DiagnosticBatcher, DiagnosticLayer};
use parley_interaction::HttpDiagnosticSink;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Running diagnostic shipping. Call [`DiagnosticsGuard::finish`] before
/// exit so the last batch is flushed.
pub struct DiagnosticsGuard {
    /// Feeds the active session into every shipped batch.
    pub session_label: Option<watch::Sender<Option<String>>>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl DiagnosticsGuard {
    pub async fn finish(self) {
        self.shutdown.cancel();
        let _ = self.task.await;
    }
}

/// Installs the global subscriber: human-readable output on stderr filtered
/// by `PARLEY_LOG` (or `RUST_LOG`), plus diagnostic shipping when enabled.
pub fn init(config: &ClientConfig, offline: bool) -> Result<Option<DiagnosticsGuard>> {
    let filter = EnvFilter::try_from_env("PARLEY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    if offline || !config.diagnostics.enabled {
        tracing_subscriber::registry().with(stderr).try_init()?;
        return Ok(None);
    }

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    let sink = Arc::new(HttpDiagnosticSink::new(client, &config.normalized_base_url())?);
    let (layer, entries) = DiagnosticLayer::channel();
    let (label_tx, label_rx) = watch::channel(None);
    let shutdown = CancellationToken::new();
    let task = DiagnosticBatcher::new(sink, config.diagnostics.clone())
        .with_session_id(label_rx)
        .spawn(entries, shutdown.clone());

    tracing_subscriber::registry()
        .with(stderr)
        .with(layer)
        .try_init()?;

    Ok(Some(DiagnosticsGuard {
        session_label: Some(label_tx),
        shutdown,
        task,
    }))
}
