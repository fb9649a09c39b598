//! Inputs of the conversation controller.

use parley_core::ParleyError;
use parley_core::exchange::{SendResponse, StreamChunk};
use parley_core::history::{HistoryPage, HistoryRequest, ScrollMetrics};
use parley_core::session::{AgentSummary, Identity, ServiceDefaults};
use parley_core::speech::{SpeechEvent, SpeechTimer};

/// Every timer the controller can arm. At most one of each kind runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Speech(SpeechTimer),
    /// Suppresses re-triggering history loads from one scroll gesture.
    ScrollCooldown,
    /// Quiet period after the last keystroke of a manual agent id.
    AgentIdDebounce,
    /// Re-poll of a request the service reported as in flight.
    InFlightPoll,
}

/// Something that happened: user input, a platform signal, a timer, or the
/// completion of work the controller requested.
#[derive(Debug)]
pub enum ControllerEvent {
    /// Starts the boot sequence.
    Boot,
    VerbosePreferenceLoaded(Option<bool>),
    IdentityResolved(Result<Identity, ParleyError>),
    DefaultsLoaded(Result<ServiceDefaults, ParleyError>),
    AgentsListed(Result<Vec<AgentSummary>, ParleyError>),

    /// The user edited the composition.
    CompositionEdited(String),
    /// The user asked to send the current composition.
    Submit,
    /// An agent picked from the directory; applied immediately.
    SelectAgent {
        agent_id: String,
        project_id: Option<String>,
    },
    /// A keystroke in the manual agent id field; applied after a quiet period.
    AgentIdTyped(String),
    ToggleVerbose,
    Scrolled(ScrollMetrics),
    /// Explicit request for the next older page.
    LoadOlder,
    /// The microphone button.
    MicPressed,
    /// A signal from the platform speech recognizer.
    Speech(SpeechEvent),

    SendCompleted {
        key: String,
        result: Result<SendResponse, ParleyError>,
    },
    StreamChunk {
        key: String,
        chunk: StreamChunk,
    },
    /// The progressive connection ended, or could not be opened.
    StreamClosed {
        key: String,
        error: Option<ParleyError>,
    },
    HistoryLoaded {
        request: HistoryRequest,
        result: Result<HistoryPage, ParleyError>,
    },
    TimerElapsed {
        timer: TimerKind,
        generation: u64,
    },

    Shutdown,
}
