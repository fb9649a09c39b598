//! Outputs of the conversation controller.

use std::time::Duration;

use parley_core::DeliveryMode;
use parley_core::exchange::SendRequest;
use parley_core::history::HistoryRequest;
use parley_core::session::ConversationSession;

use crate::event::TimerKind;

/// Work the controller asks its runtime to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Redraw the transcript. With `preserve_viewport` the visible content
    /// must stay in place although entries were inserted above it; otherwise
    /// the view follows the live tail.
    Render { preserve_viewport: bool },
    SetComposition(String),
    FocusInput,
    PlayCue,
    Notify(String),

    StartRecognition,
    StopRecognition,
    AbortRecognition,

    /// Arms `timer`, replacing any running timer of the same kind.
    Schedule {
        timer: TimerKind,
        generation: u64,
        after: Duration,
    },
    CancelTimer(TimerKind),

    SendMessage {
        request: SendRequest,
        mode: DeliveryMode,
    },
    FetchHistory(HistoryRequest),
    ListAgents { project_id: Option<String> },
    ResolveIdentity,
    LoadDefaults,
    LoadVerbosePreference,
    PersistVerbose(bool),
    /// The active session changed.
    SessionChanged(ConversationSession),
}
