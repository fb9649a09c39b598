//! The conversation controller.
//!
//! Owns the transcript, the session state and the three components that
//! write into it (speech capture, message exchange, history paging). All
//! state changes happen in [`ConversationController::handle`], which never
//! performs I/O: everything the outside world has to do comes back as a list
//! of [`Effect`]s.

use std::collections::HashMap;
use std::time::Duration;

use parley_core::exchange::{ExchangeOutcome, ExchangePipeline, ExchangeStatus, SubmitRejection};
use parley_core::history::{HistoryPage, HistoryPager, HistoryRequest};
use parley_core::session::{ConversationSession, Epoch, ServiceDefaults, SessionState};
use parley_core::speech::{SpeechEffect, SpeechEvent, SpeechMachine, SpeechSettings, SpeechState};
use parley_core::transcript::TranscriptBuffer;
use parley_core::{ClientConfig, DeliveryMode};

use crate::effect::Effect;
use crate::event::{ControllerEvent, TimerKind};

/// Timing knobs the controller needs from [`ClientConfig`].
#[derive(Debug, Clone, Copy)]
struct Timings {
    scroll_cooldown: Duration,
    agent_id_debounce: Duration,
    in_flight_poll: Duration,
}

pub struct ConversationController {
    session: SessionState,
    transcript: TranscriptBuffer,
    exchange: ExchangePipeline,
    history: HistoryPager,
    speech: SpeechMachine,
    composition: String,
    delivery_mode: DeliveryMode,
    timings: Timings,
    defaults: ServiceDefaults,
    /// Workspace scope applied to manually entered agent ids.
    project_id: Option<String>,
    pending_agent_id: Option<String>,
    next_generation: u64,
    armed: HashMap<TimerKind, u64>,
}

impl ConversationController {
    pub fn new(config: &ClientConfig, speech_supported: bool) -> Self {
        Self {
            session: SessionState::new(false),
            transcript: TranscriptBuffer::new(),
            exchange: ExchangePipeline::new(),
            history: HistoryPager::from(config),
            speech: SpeechMachine::new(speech_supported, SpeechSettings::from(config)),
            composition: String::new(),
            delivery_mode: config.delivery_mode,
            timings: Timings {
                scroll_cooldown: config.scroll_cooldown(),
                agent_id_debounce: config.agent_id_debounce(),
                in_flight_poll: config.in_flight_poll(),
            },
            defaults: ServiceDefaults::default(),
            project_id: None,
            pending_agent_id: None,
            next_generation: 0,
            armed: HashMap::new(),
        }
    }

    pub fn transcript(&self) -> &TranscriptBuffer {
        &self.transcript
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn composition(&self) -> &str {
        &self.composition
    }

    pub fn speech_state(&self) -> SpeechState {
        self.speech.state()
    }

    pub fn exchange(&self) -> &ExchangePipeline {
        &self.exchange
    }

    pub fn history(&self) -> &HistoryPager {
        &self.history
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    /// Applies one event and returns the effects to execute, in order.
    pub fn handle(&mut self, event: ControllerEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            ControllerEvent::Boot => {
                tracing::info!("[Runtime] Booting controller");
                effects.push(Effect::LoadVerbosePreference);
            }
            ControllerEvent::VerbosePreferenceLoaded(stored) => {
                let verbose = stored.unwrap_or(false);
                if let Some(epoch) = self.session.set_verbose(verbose) {
                    tracing::info!("[Preferences] Restored verbose mode: {}", verbose);
                    if self.session.is_active() {
                        self.reload(epoch, &mut effects);
                    }
                }
                effects.push(Effect::ResolveIdentity);
            }
            ControllerEvent::IdentityResolved(result) => {
                match result {
                    Ok(identity) => self.session.set_identity(identity),
                    Err(e) => tracing::warn!(
                        "[Session] Identity unavailable, continuing unauthenticated: {}",
                        e
                    ),
                }
                effects.push(Effect::LoadDefaults);
            }
            ControllerEvent::DefaultsLoaded(result) => {
                match result {
                    Ok(defaults) => {
                        if self.project_id.is_none() {
                            self.project_id = defaults.default_project_id.clone();
                        }
                        self.defaults = defaults;
                    }
                    Err(e) => tracing::warn!("[Session] Could not load service defaults: {}", e),
                }
                effects.push(Effect::ListAgents {
                    project_id: self.project_id.clone(),
                });
            }
            ControllerEvent::AgentsListed(result) => {
                match result {
                    Ok(agents) => {
                        tracing::debug!("[Session] {} agents available", agents.len());
                        self.session.set_agents(agents);
                    }
                    Err(e) => tracing::warn!("[Session] Could not list agents: {}", e),
                }
                if !self.session.is_active()
                    && let Some(session) = self.defaults.default_session()
                {
                    self.activate(session, &mut effects);
                }
            }

            ControllerEvent::CompositionEdited(text) => {
                self.composition = text;
            }
            ControllerEvent::Submit => self.submit(&mut effects),
            ControllerEvent::SelectAgent {
                agent_id,
                project_id,
            } => {
                self.pending_agent_id = None;
                self.cancel(TimerKind::AgentIdDebounce, &mut effects);
                self.project_id = project_id;
                match ConversationSession::new(&agent_id, self.project_id.as_deref()) {
                    Some(session) => self.activate(session, &mut effects),
                    None => tracing::debug!("[Session] Ignoring blank agent selection"),
                }
            }
            ControllerEvent::AgentIdTyped(text) => {
                self.pending_agent_id = Some(text);
                self.arm(
                    TimerKind::AgentIdDebounce,
                    self.timings.agent_id_debounce,
                    &mut effects,
                );
            }
            ControllerEvent::ToggleVerbose => {
                let verbose = !self.session.verbose();
                if let Some(epoch) = self.session.set_verbose(verbose) {
                    tracing::info!("[Preferences] Verbose mode {}", if verbose { "on" } else { "off" });
                    effects.push(Effect::PersistVerbose(verbose));
                    self.reload(epoch, &mut effects);
                }
            }
            ControllerEvent::Scrolled(metrics) => {
                if let Some(request) =
                    self.history
                        .on_scroll(&metrics, self.session.current(), self.session.view_epoch())
                {
                    self.arm(
                        TimerKind::ScrollCooldown,
                        self.timings.scroll_cooldown,
                        &mut effects,
                    );
                    effects.push(Effect::FetchHistory(request));
                }
            }
            ControllerEvent::LoadOlder => {
                if let Some(request) = self
                    .history
                    .request_older(self.session.current(), self.session.view_epoch())
                {
                    effects.push(Effect::FetchHistory(request));
                }
            }
            ControllerEvent::MicPressed => {
                let event = self.speech.toggle_event();
                self.apply_speech(event, &mut effects);
            }
            ControllerEvent::Speech(event) => self.apply_speech(event, &mut effects),

            ControllerEvent::SendCompleted { key, result } => {
                let outcome =
                    self.exchange
                        .on_response(&key, result, self.session.epoch(), &mut self.transcript);
                self.after_exchange(outcome, &mut effects);
            }
            ControllerEvent::StreamChunk { key, chunk } => {
                let outcome =
                    self.exchange
                        .on_chunk(&key, chunk, self.session.epoch(), &mut self.transcript);
                self.after_exchange(outcome, &mut effects);
            }
            ControllerEvent::StreamClosed { key, error } => {
                if let Some(outcome) = self.exchange.on_stream_closed(
                    &key,
                    error,
                    self.session.epoch(),
                    &mut self.transcript,
                ) {
                    self.after_exchange(outcome, &mut effects);
                }
            }
            ControllerEvent::HistoryLoaded { request, result } => {
                self.on_history(request, result, &mut effects);
            }
            ControllerEvent::TimerElapsed { timer, generation } => {
                self.on_timer(timer, generation, &mut effects);
            }

            ControllerEvent::Shutdown => {
                tracing::info!("[Runtime] Shutting down controller");
                self.apply_speech(SpeechEvent::Shutdown, &mut effects);
                let armed: Vec<TimerKind> = self.armed.keys().copied().collect();
                for timer in armed {
                    self.cancel(timer, &mut effects);
                }
            }
        }

        effects
    }

    /// Replaces the active session and starts a fresh initial load.
    fn activate(&mut self, session: ConversationSession, effects: &mut Vec<Effect>) {
        let Some(epoch) = self.session.activate(session.clone()) else {
            return;
        };
        effects.push(Effect::SessionChanged(session));
        self.reload(epoch, effects);
    }

    /// Empties the transcript and reloads the newest page under the view
    /// epoch `epoch`. An outstanding send of the same session keeps its
    /// loading placeholder.
    fn reload(&mut self, epoch: Epoch, effects: &mut Vec<Effect>) {
        self.transcript.clear();
        self.exchange
            .restore_placeholder(self.session.epoch(), &mut self.transcript);
        self.history.reset();
        self.cancel(TimerKind::ScrollCooldown, effects);
        effects.push(Effect::Render {
            preserve_viewport: false,
        });

        if let Some(session) = self.session.current() {
            let request = self.history.initial_request(session, epoch);
            effects.push(Effect::FetchHistory(request));
        }
    }

    fn submit(&mut self, effects: &mut Vec<Effect>) {
        let submitted = self.exchange.submit(
            &self.composition,
            self.session.current(),
            self.session.epoch(),
            self.session.verbose(),
            &mut self.transcript,
        );
        match submitted {
            Ok(request) => {
                effects.push(Effect::Render {
                    preserve_viewport: false,
                });
                effects.push(Effect::SendMessage {
                    request,
                    mode: self.delivery_mode,
                });
            }
            Err(SubmitRejection::NoSession) => {
                effects.push(Effect::Render {
                    preserve_viewport: false,
                });
            }
            Err(SubmitRejection::EmptyText | SubmitRejection::InFlight) => {}
        }
    }

    fn after_exchange(&mut self, outcome: ExchangeOutcome, effects: &mut Vec<Effect>) {
        if outcome.clear_composition {
            self.composition.clear();
            effects.push(Effect::SetComposition(String::new()));
        }
        if outcome.transcript_changed {
            effects.push(Effect::Render {
                preserve_viewport: false,
            });
        }
        if outcome.status == ExchangeStatus::AwaitingOriginal {
            self.arm(TimerKind::InFlightPoll, self.timings.in_flight_poll, effects);
        } else if outcome.is_terminal() {
            self.cancel(TimerKind::InFlightPoll, effects);
        }
    }

    fn on_history(
        &mut self,
        request: HistoryRequest,
        result: parley_core::Result<HistoryPage>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(outcome) = self.history.on_page(
            &request,
            result,
            self.session.view_epoch(),
            self.session.verbose(),
            &mut self.transcript,
        ) else {
            return;
        };
        if outcome.initial || outcome.inserted > 0 {
            effects.push(Effect::Render {
                preserve_viewport: !outcome.initial,
            });
        }
    }

    fn on_timer(&mut self, timer: TimerKind, generation: u64, effects: &mut Vec<Effect>) {
        if let TimerKind::Speech(speech_timer) = timer {
            self.apply_speech(
                SpeechEvent::TimerElapsed {
                    timer: speech_timer,
                    generation,
                },
                effects,
            );
            return;
        }

        if self.armed.get(&timer) != Some(&generation) {
            tracing::debug!("[Runtime] Ignoring stale {:?} timer", timer);
            return;
        }
        self.armed.remove(&timer);

        match timer {
            TimerKind::ScrollCooldown => self.history.end_cooldown(),
            TimerKind::AgentIdDebounce => {
                let typed = self.pending_agent_id.take().unwrap_or_default();
                if let Some(session) = ConversationSession::new(&typed, self.project_id.as_deref()) {
                    self.activate(session, effects);
                }
            }
            TimerKind::InFlightPoll => {
                if let Some(request) = self.exchange.repoll_request() {
                    tracing::debug!("[Exchange] Re-polling {}", request.idempotency_key);
                    effects.push(Effect::SendMessage {
                        request,
                        mode: self.delivery_mode,
                    });
                }
            }
            TimerKind::Speech(_) => {}
        }
    }

    fn apply_speech(&mut self, event: SpeechEvent, effects: &mut Vec<Effect>) {
        for effect in self.speech.apply(event, &self.composition) {
            effects.push(match effect {
                SpeechEffect::StartPlatform => Effect::StartRecognition,
                SpeechEffect::StopPlatform => Effect::StopRecognition,
                SpeechEffect::AbortPlatform => Effect::AbortRecognition,
                SpeechEffect::ArmTimer {
                    timer,
                    generation,
                    after,
                } => Effect::Schedule {
                    timer: TimerKind::Speech(timer),
                    generation,
                    after,
                },
                SpeechEffect::CancelTimer(timer) => Effect::CancelTimer(TimerKind::Speech(timer)),
                SpeechEffect::SetComposition(text) => {
                    self.composition.clone_from(&text);
                    Effect::SetComposition(text)
                }
                SpeechEffect::PlayStopCue => Effect::PlayCue,
                SpeechEffect::FocusInput => Effect::FocusInput,
                SpeechEffect::Notify(message) => Effect::Notify(message),
            });
        }
    }

    fn arm(&mut self, timer: TimerKind, after: Duration, effects: &mut Vec<Effect>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.armed.insert(timer, generation);
        effects.push(Effect::Schedule {
            timer,
            generation,
            after,
        });
    }

    fn cancel(&mut self, timer: TimerKind, effects: &mut Vec<Effect>) {
        if self.armed.remove(&timer).is_some() {
            effects.push(Effect::CancelTimer(timer));
        }
    }
}
