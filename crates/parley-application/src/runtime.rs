//! Tokio runtime for the conversation controller.
//!
//! A single task owns the controller and the host surfaces and processes
//! events one at a time. Network calls run on spawned tasks and report back
//! through the same channel, so every state change still happens in one
//! place. Timers are abortable tasks, one per [`TimerKind`].

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use parley_core::DeliveryMode;
use parley_core::exchange::{SendRequest, StreamChunk};
use parley_core::history::ScrollAnchor;
use parley_core::ports::{
    AgentService, FeedbackCue, PreferenceRepository, SpeechRecognizer, TranscriptView,
    VERBOSE_MODE_KEY,
};
use parley_core::transcript::TranscriptEntry;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::controller::ConversationController;
use crate::effect::Effect;
use crate::event::{ControllerEvent, TimerKind};

/// Host surfaces driven from the event loop.
pub struct Platform {
    pub view: Box<dyn TranscriptView>,
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub cue: Box<dyn FeedbackCue>,
}

/// Cloneable entry point for feeding events into a running controller.
#[derive(Clone)]
pub struct RuntimeHandle {
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl RuntimeHandle {
    /// Queues an event. Returns false once the runtime has stopped.
    pub fn dispatch(&self, event: ControllerEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

pub struct ControllerRuntime {
    controller: ConversationController,
    service: Arc<dyn AgentService>,
    preferences: Arc<dyn PreferenceRepository>,
    platform: Platform,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    timers: HashMap<TimerKind, AbortHandle>,
    session_label: Option<watch::Sender<Option<String>>>,
}

impl ControllerRuntime {
    pub fn new(
        controller: ConversationController,
        service: Arc<dyn AgentService>,
        preferences: Arc<dyn PreferenceRepository>,
        platform: Platform,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            service,
            preferences,
            platform,
            events_tx,
            events_rx,
            timers: HashMap::new(),
            session_label: None,
        }
    }

    /// Publishes the active session (as `agent@project`) on every change.
    pub fn with_session_label(mut self, label: watch::Sender<Option<String>>) -> Self {
        self.session_label = Some(label);
        self
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            events: self.events_tx.clone(),
        }
    }

    /// Processes events until [`ControllerEvent::Shutdown`], then returns
    /// the controller.
    pub async fn run(mut self) -> ConversationController {
        tracing::debug!("[Runtime] Event loop started");
        while let Some(event) = self.events_rx.recv().await {
            let shutdown = matches!(event, ControllerEvent::Shutdown);
            for effect in self.controller.handle(event) {
                self.execute(effect);
            }
            if shutdown {
                break;
            }
        }

        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
        tracing::debug!("[Runtime] Event loop stopped");
        self.controller
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Render { preserve_viewport } => self.render(preserve_viewport),
            Effect::SetComposition(text) => self.platform.view.set_composition(&text),
            Effect::FocusInput => self.platform.view.focus_input(),
            Effect::PlayCue => self.platform.cue.play_stop_cue(),
            Effect::Notify(message) => self.platform.view.notify(&message),

            Effect::StartRecognition => self.platform.recognizer.start(),
            Effect::StopRecognition => self.platform.recognizer.stop(),
            Effect::AbortRecognition => self.platform.recognizer.abort(),

            Effect::Schedule {
                timer,
                generation,
                after,
            } => {
                let events = self.events_tx.clone();
                let task = tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = events.send(ControllerEvent::TimerElapsed { timer, generation });
                });
                if let Some(previous) = self.timers.insert(timer, task.abort_handle()) {
                    previous.abort();
                }
            }
            Effect::CancelTimer(timer) => {
                if let Some(task) = self.timers.remove(&timer) {
                    task.abort();
                }
            }

            Effect::SendMessage { request, mode } => self.spawn_send(request, mode),
            Effect::FetchHistory(request) => {
                let service = self.service.clone();
                self.spawn_reply(async move {
                    let result = service.history(&request.query).await;
                    ControllerEvent::HistoryLoaded { request, result }
                });
            }
            Effect::ListAgents { project_id } => {
                let service = self.service.clone();
                self.spawn_reply(async move {
                    ControllerEvent::AgentsListed(service.list_agents(project_id.as_deref()).await)
                });
            }
            Effect::ResolveIdentity => {
                let service = self.service.clone();
                self.spawn_reply(async move { ControllerEvent::IdentityResolved(service.identity().await) });
            }
            Effect::LoadDefaults => {
                let service = self.service.clone();
                self.spawn_reply(async move { ControllerEvent::DefaultsLoaded(service.defaults().await) });
            }
            Effect::LoadVerbosePreference => {
                let preferences = self.preferences.clone();
                self.spawn_reply(async move {
                    let stored = preferences
                        .get_bool(VERBOSE_MODE_KEY)
                        .await
                        .unwrap_or_else(|e| {
                            tracing::warn!("[Preferences] Failed to read verbose mode: {}", e);
                            None
                        });
                    ControllerEvent::VerbosePreferenceLoaded(stored)
                });
            }
            Effect::PersistVerbose(verbose) => {
                let preferences = self.preferences.clone();
                tokio::spawn(async move {
                    if let Err(e) = preferences.set_bool(VERBOSE_MODE_KEY, verbose).await {
                        tracing::warn!("[Preferences] Failed to persist verbose mode: {}", e);
                    }
                });
            }
            Effect::SessionChanged(session) => {
                if let Some(label) = &self.session_label {
                    label.send_replace(Some(session.to_string()));
                }
            }
        }
    }

    /// Redraws, keeping the viewport anchored when content went in above it.
    fn render(&mut self, preserve_viewport: bool) {
        let view = &mut self.platform.view;
        let before = view.metrics();
        let entries: Vec<TranscriptEntry> = self.controller.transcript().entries().cloned().collect();
        view.render(&entries);

        if preserve_viewport {
            let anchor = ScrollAnchor::capture(&before);
            let offset = anchor.restore(view.metrics().extent);
            view.scroll_to(offset);
        } else {
            view.scroll_to_bottom();
        }
    }

    fn spawn_reply<F>(&self, work: F)
    where
        F: std::future::Future<Output = ControllerEvent> + Send + 'static,
    {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let _ = events.send(work.await);
        });
    }

    fn spawn_send(&self, request: SendRequest, mode: DeliveryMode) {
        let service = self.service.clone();
        let events = self.events_tx.clone();
        let key = request.idempotency_key.clone();

        tokio::spawn(async move {
            match mode {
                DeliveryMode::Atomic => {
                    let result = service.send(&request).await;
                    let _ = events.send(ControllerEvent::SendCompleted { key, result });
                }
                DeliveryMode::Progressive => {
                    let mut stream = match service.send_progressive(&request).await {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = events.send(ControllerEvent::StreamClosed {
                                key,
                                error: Some(e),
                            });
                            return;
                        }
                    };

                    let mut error = None;
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(chunk) => {
                                let last = matches!(chunk, StreamChunk::Done | StreamChunk::Error { .. });
                                let _ = events.send(ControllerEvent::StreamChunk {
                                    key: key.clone(),
                                    chunk,
                                });
                                if last {
                                    break;
                                }
                            }
                            Err(e) => {
                                error = Some(e);
                                break;
                            }
                        }
                    }
                    let _ = events.send(ControllerEvent::StreamClosed { key, error });
                }
            }
        });
    }
}
