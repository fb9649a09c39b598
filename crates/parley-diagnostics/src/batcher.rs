//! Batching flusher for captured diagnostic entries.

use std::sync::Arc;

use parley_core::DiagnosticsSettings;
use parley_core::ports::{DiagnosticEntry, DiagnosticSink};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Drains a channel of entries and submits them in batches.
///
/// A batch is flushed when it reaches `max_batch` entries, or once
/// `flush_interval` has passed since its first entry arrived. Sink failures
/// drop the batch.
pub struct DiagnosticBatcher {
    sink: Arc<dyn DiagnosticSink>,
    settings: DiagnosticsSettings,
    session_id: Option<watch::Receiver<Option<String>>>,
    buffer: Vec<DiagnosticEntry>,
}

impl DiagnosticBatcher {
    pub fn new(sink: Arc<dyn DiagnosticSink>, settings: DiagnosticsSettings) -> Self {
        Self {
            sink,
            settings,
            session_id: None,
            buffer: Vec::new(),
        }
    }

    /// Tags each submitted batch with the latest session identifier.
    pub fn with_session_id(mut self, session_id: watch::Receiver<Option<String>>) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn spawn(
        self,
        entries: mpsc::UnboundedReceiver<DiagnosticEntry>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(entries, shutdown))
    }

    /// Runs until the channel closes or `shutdown` fires, then flushes what
    /// is left.
    pub async fn run(
        mut self,
        mut entries: mpsc::UnboundedReceiver<DiagnosticEntry>,
        shutdown: CancellationToken,
    ) {
        let max_batch = self.settings.max_batch.max(1);
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    while let Ok(entry) = entries.try_recv() {
                        self.buffer.push(entry);
                    }
                    break;
                }
                received = entries.recv() => {
                    let Some(entry) = received else { break };
                    self.buffer.push(entry);
                    if self.buffer.len() >= max_batch {
                        self.flush().await;
                        deadline = None;
                    } else if deadline.is_none() {
                        deadline = Some(Instant::now() + self.settings.flush_interval());
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush().await;
                    deadline = None;
                }
            }
        }

        self.flush().await;
    }

    async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);
        let session_id = self
            .session_id
            .as_ref()
            .and_then(|rx| rx.borrow().clone());

        for chunk in batch.chunks(self.settings.max_batch.max(1)) {
            if let Err(e) = self.sink.submit(chunk, session_id.as_deref()).await {
                tracing::debug!("[Diagnostics] Dropped {} entries: {}", chunk.len(), e);
            }
        }
    }
}
