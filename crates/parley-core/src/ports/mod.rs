//! Ports to the collaborators the controller depends on.
//!
//! # Module Structure
//!
//! - `agent`: the remote agent service (`AgentService`)
//! - `diagnostics`: best-effort structured log delivery (`DiagnosticSink`)
//! - `preferences`: client-local persisted settings (`PreferenceRepository`)
//! - `platform`: the host surface: view, speech capability, audible cue

mod agent;
mod diagnostics;
mod platform;
mod preferences;

// Re-export public API
pub use agent::{AgentService, ChunkStream};
pub use diagnostics::{DiagnosticEntry, DiagnosticSink};
pub use platform::{FeedbackCue, SpeechRecognizer, TranscriptView};
pub use preferences::{PreferenceRepository, VERBOSE_MODE_KEY};
