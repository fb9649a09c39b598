//! Recognition results and live-input composition.

use serde::{Deserialize, Serialize};

/// One recognized segment. Interim segments may still change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub transcript: String,
    pub is_final: bool,
}

impl SpeechSegment {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn finalized(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// The full, growing result set of a recording, indexed by segment.
///
/// Platforms redeliver the whole set on every update, so deriving the text
/// from it is idempotent: the same set always yields the same transcript.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechResults {
    pub segments: Vec<SpeechSegment>,
}

/// Concatenates segments as delivered. Platforms carry word spacing inside
/// the segment text, so only the outer ends are trimmed.
fn join_segments<'a>(segments: impl Iterator<Item = &'a SpeechSegment>) -> String {
    let joined: String = segments.map(|s| s.transcript.as_str()).collect();
    joined.trim().to_string()
}

impl SpeechResults {
    pub fn new(segments: Vec<SpeechSegment>) -> Self {
        Self { segments }
    }

    /// All segments, interim included, in index order.
    pub fn transcript_so_far(&self) -> String {
        join_segments(self.segments.iter())
    }

    /// Only the segments the platform has confirmed.
    pub fn final_transcript(&self) -> String {
        join_segments(self.segments.iter().filter(|s| s.is_final))
    }
}

/// Builds the live composition from the text present before recording
/// started and the transcript so far. A single space separates them only
/// when both are non-empty.
pub fn compose_live_input(snapshot: &str, transcript: &str) -> String {
    let before = snapshot.trim_end();
    let spoken = transcript.trim();
    match (before.is_empty(), spoken.is_empty()) {
        (true, _) => spoken.to_string(),
        (false, true) => snapshot.to_string(),
        (false, false) => format!("{before} {spoken}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_separator_rules() {
        assert_eq!(compose_live_input("", "hello"), "hello");
        assert_eq!(compose_live_input("Draft:", ""), "Draft:");
        assert_eq!(compose_live_input("Draft:", "hello there"), "Draft: hello there");
        assert_eq!(compose_live_input("Draft: ", " hello"), "Draft: hello");
        assert_eq!(compose_live_input("", ""), "");
    }

    #[test]
    fn test_redelivery_is_idempotent() {
        let results = SpeechResults::new(vec![
            SpeechSegment::finalized("turn on"),
            SpeechSegment::interim(" the lights"),
        ]);
        let first = compose_live_input("Please", &results.transcript_so_far());
        let second = compose_live_input("Please", &results.clone().transcript_so_far());
        assert_eq!(first, second);
        assert_eq!(first, "Please turn on the lights");
    }

    #[test]
    fn test_growing_results_converge_on_final_transcript() {
        // Cumulative deliveries with non-decreasing segment counts.
        let deliveries = vec![
            vec![SpeechSegment::interim("hel")],
            vec![SpeechSegment::interim("hello")],
            vec![SpeechSegment::finalized("hello"), SpeechSegment::interim(" wor")],
            vec![SpeechSegment::finalized("hello"), SpeechSegment::finalized(" world")],
        ];

        let mut last = SpeechResults::default();
        for segments in deliveries {
            assert!(segments.len() >= last.segments.len());
            last = SpeechResults::new(segments);
        }

        assert_eq!(last.final_transcript(), "hello world");
        assert_eq!(last.transcript_so_far(), last.final_transcript());
    }

    #[test]
    fn test_segments_concatenate_without_inserted_spaces() {
        let results = SpeechResults::new(vec![
            SpeechSegment::finalized("今日は"),
            SpeechSegment::finalized("いい天気"),
            SpeechSegment::interim("impor"),
            SpeechSegment::interim("tant "),
        ]);
        assert_eq!(results.final_transcript(), "今日はいい天気");
        assert_eq!(results.transcript_so_far(), "今日はいい天気important");
    }
}
