//! Terminal implementations of the host surfaces.

use std::collections::HashSet;
use std::io::Write;

use colored::Colorize;
use parley_core::history::ScrollMetrics;
use parley_core::ports::{FeedbackCue, SpeechRecognizer, TranscriptView};
use parley_core::transcript::{EntryId, EntryPosition, EntryRole, TranscriptEntry};

/// Prints transcript entries as they appear.
///
/// A terminal cannot redraw above the cursor, so each render prints only the
/// entries not shown before. Older history arrives under an "earlier" rule.
#[derive(Debug, Default)]
pub struct TerminalView {
    shown: HashSet<EntryId>,
    extent: f64,
    offset: f64,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptView for TerminalView {
    fn render(&mut self, entries: &[TranscriptEntry]) {
        let current: HashSet<EntryId> = entries.iter().map(|e| e.local_id).collect();
        if !self.shown.is_empty() && self.shown.is_disjoint(&current) {
            println!("{}", "── conversation reset ──".bright_black());
            self.shown.clear();
        }

        let fresh: Vec<&TranscriptEntry> = entries
            .iter()
            .filter(|e| !self.shown.contains(&e.local_id))
            .collect();
        if !self.shown.is_empty() && fresh.iter().any(|e| e.position == EntryPosition::Prepend) {
            println!("{}", "── earlier ──".bright_black());
        }
        for entry in fresh {
            println!("{}", format_entry(entry));
            self.shown.insert(entry.local_id);
        }

        self.shown.retain(|id| current.contains(id));
        self.extent = entries.len() as f64;
    }

    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics::new(self.offset, self.extent, self.extent)
    }

    fn scroll_to(&mut self, offset: f64) {
        self.offset = offset;
    }

    fn scroll_to_bottom(&mut self) {
        self.offset = self.extent;
    }

    fn set_composition(&mut self, text: &str) {
        // The prompt owns the input line; only recognized speech is echoed.
        if !text.is_empty() {
            println!("{}", format!("(draft) {text}").bright_black());
        }
    }

    fn focus_input(&mut self) {}

    fn notify(&mut self, message: &str) {
        println!("{}", format!("! {message}").yellow());
    }
}

pub fn format_entry(entry: &TranscriptEntry) -> String {
    let text = entry.text.as_str();
    match entry.role {
        EntryRole::User => format!("{} {}", "you ›".green().bold(), text.green()),
        EntryRole::Agent => text.bright_blue().to_string(),
        EntryRole::System => text.yellow().to_string(),
        EntryRole::Loading => text.bright_black().italic().to_string(),
        EntryRole::DebugReasoning => format!("[reasoning] {text}").magenta().dimmed().to_string(),
        EntryRole::DebugToolCall => format!("[tool] {text}").magenta().to_string(),
        EntryRole::DebugToolResult => format!("[result] {text}").magenta().dimmed().to_string(),
    }
}

/// Terminals have no speech capture.
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn start(&mut self) {}

    fn stop(&mut self) {}

    fn abort(&mut self) {}
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl FeedbackCue for TerminalBell {
    fn play_stop_cue(&mut self) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, role: EntryRole, text: &str, position: EntryPosition) -> TranscriptEntry {
        TranscriptEntry {
            local_id: EntryId(id),
            id: None,
            role,
            text: text.to_string(),
            position,
        }
    }

    #[test]
    fn test_format_entry_prefixes_roles() {
        colored::control::set_override(false);
        let user = entry(1, EntryRole::User, "Hi", EntryPosition::Append);
        let tool = entry(2, EntryRole::DebugToolCall, "search(q)", EntryPosition::Append);
        assert_eq!(format_entry(&user), "you › Hi");
        assert_eq!(format_entry(&tool), "[tool] search(q)");
    }

    #[test]
    fn test_render_tracks_shown_entries() {
        let mut view = TerminalView::new();
        let first = vec![entry(1, EntryRole::User, "Hi", EntryPosition::Append)];
        view.render(&first);
        assert_eq!(view.shown.len(), 1);

        let cleared = vec![entry(5, EntryRole::Agent, "old", EntryPosition::Prepend)];
        view.render(&cleared);
        assert!(view.shown.contains(&EntryId(5)));
        assert!(!view.shown.contains(&EntryId(1)));
        assert_eq!(view.metrics().extent, 1.0);
    }
}
