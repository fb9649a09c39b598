//! Recording lifecycle state machine.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::{SpeechErrorKind, StartRejection};
use super::results::{SpeechResults, compose_live_input};
use crate::config::ClientConfig;

const UNSUPPORTED_NOTICE: &str = "Voice input is not supported on this device.";
const START_FAILED_NOTICE: &str = "Voice input could not start. Please try again.";
const START_TIMEOUT_NOTICE: &str = "Voice input did not start in time. Please try again.";

/// Timers owned by the machine. Each arm carries a generation so that an
/// expiry delivered after the timer was superseded is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechTimer {
    /// Forces a stop once the recording reaches its maximum length.
    MaxDuration,
    /// Delay before the single start retry.
    RetryDelay,
    /// Bounds how long the machine waits for the platform to confirm a
    /// start or a stop.
    Watchdog,
}

const ALL_TIMERS: [SpeechTimer; 3] = [
    SpeechTimer::MaxDuration,
    SpeechTimer::RetryDelay,
    SpeechTimer::Watchdog,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    /// The platform has no speech capability. Absorbing.
    Unsupported,
    Idle,
    /// Waiting for the platform to confirm start. `awaiting_retry` is set
    /// between an "already active" rejection and the retry.
    Starting { attempt: u8, awaiting_retry: bool },
    Listening,
    Stopping,
}

impl SpeechState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Starting { .. } | Self::Listening | Self::Stopping
        )
    }
}

/// The one recording that may exist at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    /// Composition text at the moment recording (re)started.
    pub text_snapshot_before_start: String,
    pub started_at: DateTime<Utc>,
}

/// Inputs to [`SpeechMachine::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    StartRequested,
    StopRequested,
    /// The platform confirmed that recognition is running.
    PlatformStarted,
    StartRejected(StartRejection),
    /// Cumulative results for the current recording.
    Results(SpeechResults),
    PlatformError(SpeechErrorKind),
    /// The platform detected the end of speech. Does not stop recording.
    SpeechEnded,
    /// The platform recognition session ended.
    PlatformEnded,
    TimerElapsed { timer: SpeechTimer, generation: u64 },
    /// Controller teardown.
    Shutdown,
}

/// Outputs of [`SpeechMachine::apply`], executed by the caller in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEffect {
    StartPlatform,
    StopPlatform,
    AbortPlatform,
    ArmTimer {
        timer: SpeechTimer,
        generation: u64,
        after: Duration,
    },
    CancelTimer(SpeechTimer),
    SetComposition(String),
    PlayStopCue,
    FocusInput,
    Notify(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechSettings {
    pub max_duration: Duration,
    pub retry_delay: Duration,
    pub start_timeout: Duration,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(60),
            retry_delay: Duration::from_millis(100),
            start_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&ClientConfig> for SpeechSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_duration: config.max_recording(),
            retry_delay: config.speech_retry_delay(),
            start_timeout: config.speech_start_timeout(),
        }
    }
}

#[derive(Debug)]
pub struct SpeechMachine {
    state: SpeechState,
    session: Option<RecordingSession>,
    settings: SpeechSettings,
    next_generation: u64,
    armed: HashMap<SpeechTimer, u64>,
}

impl SpeechMachine {
    /// Creates a machine; `supported = false` yields the absorbing
    /// `Unsupported` state.
    pub fn new(supported: bool, settings: SpeechSettings) -> Self {
        let state = if supported {
            SpeechState::Idle
        } else {
            SpeechState::Unsupported
        };
        Self {
            state,
            session: None,
            settings,
            next_generation: 0,
            armed: HashMap::new(),
        }
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// The event a single "microphone" button press maps to.
    pub fn toggle_event(&self) -> SpeechEvent {
        if self.state.is_active() {
            SpeechEvent::StopRequested
        } else {
            SpeechEvent::StartRequested
        }
    }

    /// Applies one event. `composition` is the current input text.
    pub fn apply(&mut self, event: SpeechEvent, composition: &str) -> Vec<SpeechEffect> {
        let mut effects = Vec::new();

        if let SpeechEvent::TimerElapsed { timer, generation } = &event
            && !self.claim_timer(*timer, *generation)
        {
            tracing::debug!("[Speech] Ignoring stale {:?} timer (generation {})", timer, generation);
            return effects;
        }

        match (self.state, event) {
            (SpeechState::Unsupported, SpeechEvent::StartRequested) => {
                effects.push(SpeechEffect::Notify(UNSUPPORTED_NOTICE.to_string()));
            }
            (SpeechState::Unsupported, _) => {}

            (SpeechState::Idle, SpeechEvent::StartRequested) => {
                self.begin_start(composition, 1, &mut effects);
            }

            (
                SpeechState::Starting {
                    awaiting_retry: false,
                    ..
                },
                SpeechEvent::PlatformStarted,
            ) => {
                self.cancel_timer(SpeechTimer::Watchdog, &mut effects);
                self.state = SpeechState::Listening;
                self.arm_timer(SpeechTimer::MaxDuration, self.settings.max_duration, &mut effects);
                tracing::info!("[Speech] Listening");
            }

            (
                SpeechState::Starting {
                    attempt: 1,
                    awaiting_retry: false,
                },
                SpeechEvent::StartRejected(StartRejection::AlreadyActive),
            ) => {
                tracing::warn!("[Speech] Platform reports recognition already active, retrying once");
                self.cancel_timer(SpeechTimer::Watchdog, &mut effects);
                effects.push(SpeechEffect::AbortPlatform);
                self.state = SpeechState::Starting {
                    attempt: 2,
                    awaiting_retry: true,
                };
                self.arm_timer(SpeechTimer::RetryDelay, self.settings.retry_delay, &mut effects);
            }

            (
                SpeechState::Starting {
                    awaiting_retry: false,
                    attempt,
                },
                SpeechEvent::StartRejected(rejection),
            ) => {
                tracing::warn!(
                    "[Speech] Start rejected on attempt {}: {:?}",
                    attempt,
                    rejection
                );
                self.reset(&mut effects);
                effects.push(SpeechEffect::Notify(START_FAILED_NOTICE.to_string()));
            }

            (
                SpeechState::Starting {
                    attempt,
                    awaiting_retry: true,
                },
                SpeechEvent::TimerElapsed {
                    timer: SpeechTimer::RetryDelay,
                    ..
                },
            ) => {
                self.begin_start(composition, attempt, &mut effects);
            }

            (
                SpeechState::Starting {
                    awaiting_retry: true,
                    ..
                },
                SpeechEvent::StopRequested,
            ) => {
                // Nothing is running on the platform between abort and retry.
                self.finish(composition, &mut effects);
            }

            (SpeechState::Starting { .. } | SpeechState::Listening, SpeechEvent::StopRequested) => {
                self.request_stop(&mut effects);
            }

            (
                SpeechState::Starting { .. },
                SpeechEvent::TimerElapsed {
                    timer: SpeechTimer::Watchdog,
                    ..
                },
            ) => {
                tracing::warn!("[Speech] Platform did not confirm start in time");
                effects.push(SpeechEffect::AbortPlatform);
                self.reset(&mut effects);
                effects.push(SpeechEffect::Notify(START_TIMEOUT_NOTICE.to_string()));
            }

            (
                SpeechState::Listening,
                SpeechEvent::TimerElapsed {
                    timer: SpeechTimer::MaxDuration,
                    ..
                },
            ) => {
                tracing::info!(
                    "[Speech] Maximum recording duration ({}s) reached, stopping",
                    self.settings.max_duration.as_secs()
                );
                self.request_stop(&mut effects);
            }

            (
                SpeechState::Stopping,
                SpeechEvent::TimerElapsed {
                    timer: SpeechTimer::Watchdog,
                    ..
                },
            ) => {
                tracing::warn!("[Speech] Platform did not confirm stop in time, aborting");
                effects.push(SpeechEffect::AbortPlatform);
                self.finish(composition, &mut effects);
            }

            (SpeechState::Listening | SpeechState::Stopping, SpeechEvent::Results(results)) => {
                if let Some(session) = &self.session {
                    let live = compose_live_input(
                        &session.text_snapshot_before_start,
                        &results.transcript_so_far(),
                    );
                    effects.push(SpeechEffect::SetComposition(live));
                }
            }

            (SpeechState::Listening | SpeechState::Stopping, SpeechEvent::PlatformEnded) => {
                self.finish(composition, &mut effects);
            }

            (
                SpeechState::Starting {
                    awaiting_retry: true,
                    ..
                },
                SpeechEvent::PlatformError(SpeechErrorKind::Aborted),
            ) => {
                // Our own abort ahead of the retry.
            }

            (state, SpeechEvent::PlatformError(kind)) if state.is_active() => {
                tracing::warn!("[Speech] Platform error in {:?}: {}", state, kind);
                self.finish(composition, &mut effects);
                if let Some(notice) = kind.user_notice() {
                    effects.push(SpeechEffect::Notify(notice));
                }
            }

            (state, SpeechEvent::Shutdown) if state.is_active() => {
                effects.push(SpeechEffect::AbortPlatform);
                self.reset(&mut effects);
            }

            (state, event) => {
                tracing::debug!("[Speech] Ignoring {:?} in {:?}", event, state);
            }
        }

        effects
    }

    fn begin_start(&mut self, composition: &str, attempt: u8, effects: &mut Vec<SpeechEffect>) {
        self.session = Some(RecordingSession {
            text_snapshot_before_start: composition.to_string(),
            started_at: Utc::now(),
        });
        self.state = SpeechState::Starting {
            attempt,
            awaiting_retry: false,
        };
        effects.push(SpeechEffect::StartPlatform);
        self.arm_timer(SpeechTimer::Watchdog, self.settings.start_timeout, effects);
        tracing::debug!("[Speech] Starting recognition (attempt {})", attempt);
    }

    fn request_stop(&mut self, effects: &mut Vec<SpeechEffect>) {
        self.cancel_all(effects);
        effects.push(SpeechEffect::StopPlatform);
        self.state = SpeechState::Stopping;
        self.arm_timer(SpeechTimer::Watchdog, self.settings.start_timeout, effects);
    }

    /// Orderly return to idle with the confirmation cue.
    fn finish(&mut self, composition: &str, effects: &mut Vec<SpeechEffect>) {
        self.reset(effects);
        effects.push(SpeechEffect::PlayStopCue);
        if !composition.trim().is_empty() {
            effects.push(SpeechEffect::FocusInput);
        }
        tracing::info!("[Speech] Recording finished");
    }

    fn reset(&mut self, effects: &mut Vec<SpeechEffect>) {
        self.cancel_all(effects);
        self.session = None;
        self.state = SpeechState::Idle;
    }

    fn arm_timer(&mut self, timer: SpeechTimer, after: Duration, effects: &mut Vec<SpeechEffect>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.armed.insert(timer, generation);
        effects.push(SpeechEffect::ArmTimer {
            timer,
            generation,
            after,
        });
    }

    fn cancel_timer(&mut self, timer: SpeechTimer, effects: &mut Vec<SpeechEffect>) {
        if self.armed.remove(&timer).is_some() {
            effects.push(SpeechEffect::CancelTimer(timer));
        }
    }

    fn cancel_all(&mut self, effects: &mut Vec<SpeechEffect>) {
        for timer in ALL_TIMERS {
            self.cancel_timer(timer, effects);
        }
    }

    /// Consumes an expiry if it matches the currently armed generation.
    fn claim_timer(&mut self, timer: SpeechTimer, generation: u64) -> bool {
        if self.armed.get(&timer) == Some(&generation) {
            self.armed.remove(&timer);
            true
        } else {
            false
        }
    }
}
