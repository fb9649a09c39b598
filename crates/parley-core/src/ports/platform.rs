//! Host surface ports.
//!
//! These are synchronous: they are only called from the controller's event
//! loop, which owns them.

use crate::history::ScrollMetrics;
use crate::transcript::TranscriptEntry;

/// Where the transcript is shown and the composition is edited.
pub trait TranscriptView: Send {
    /// Redraws the transcript.
    fn render(&mut self, entries: &[TranscriptEntry]);

    /// Current scroll measurements of the transcript.
    fn metrics(&self) -> ScrollMetrics;

    fn scroll_to(&mut self, offset: f64);

    fn scroll_to_bottom(&mut self);

    fn set_composition(&mut self, text: &str);

    fn focus_input(&mut self);

    /// Shows a short, transient notice.
    fn notify(&mut self, message: &str);
}

/// Platform speech-to-text capability.
///
/// Lifecycle confirmations, results and errors are reported back to the
/// controller as events.
pub trait SpeechRecognizer: Send {
    fn is_supported(&self) -> bool;

    fn start(&mut self);

    /// Graceful stop; pending results are still delivered.
    fn stop(&mut self);

    /// Immediate stop; pending results are discarded.
    fn abort(&mut self);
}

/// Audible confirmation when a recording ends.
pub trait FeedbackCue: Send {
    fn play_stop_cue(&mut self);
}
