//! Speech capture domain module.
//!
//! Wraps a platform speech-to-text capability into a bounded-lifetime
//! recording session. The state machine is pure: it consumes
//! [`SpeechEvent`]s and returns [`SpeechEffect`]s for the caller to execute,
//! so it can be driven in tests without any platform present.
//!
//! # Module Structure
//!
//! - `error`: platform error taxonomy (`SpeechErrorKind`)
//! - `results`: cumulative recognition results and live-input composition
//! - `machine`: the recording lifecycle (`SpeechMachine`)

mod error;
mod machine;
mod results;

// Re-export public API
pub use error::{SpeechErrorKind, StartRejection};
pub use machine::{
    RecordingSession, SpeechEffect, SpeechEvent, SpeechMachine, SpeechSettings, SpeechState,
    SpeechTimer,
};
pub use results::{SpeechResults, SpeechSegment, compose_live_input};
