//! Tracing layer that captures events as diagnostic entries.

use chrono::Utc;
use parley_core::ports::DiagnosticEntry;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Events from this crate are never captured, so sink failures cannot feed
/// back into the batch they came from.
const SELF_TARGET: &str = "parley_diagnostics";

/// Forwards every event at or above `min_level` to a channel.
pub struct DiagnosticLayer {
    sender: mpsc::UnboundedSender<DiagnosticEntry>,
    min_level: Level,
}

impl DiagnosticLayer {
    pub fn new(sender: mpsc::UnboundedSender<DiagnosticEntry>) -> Self {
        Self {
            sender,
            min_level: Level::INFO,
        }
    }

    /// Layer plus the receiving end for a [`crate::DiagnosticBatcher`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DiagnosticEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }
}

impl<S> Layer<S> for DiagnosticLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // tracing orders levels by verbosity: TRACE is the greatest.
        if *metadata.level() > self.min_level || metadata.target().starts_with(SELF_TARGET) {
            return;
        }

        let mut fields = Map::new();
        event.record(&mut FieldVisitor(&mut fields));

        let raw = match fields.remove("message") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let (category, message) = match split_category(&raw) {
            Some((tag, rest)) => (tag.to_string(), rest.to_string()),
            None => (metadata.target().to_string(), raw),
        };

        let entry = DiagnosticEntry {
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            category,
            message,
            data: if fields.is_empty() {
                Value::Null
            } else {
                Value::Object(fields)
            },
        };

        // Receiver gone means diagnostics were shut down.
        let _ = self.sender.send(entry);
    }
}

/// Splits a `[Tag] message` line into its tag and the remaining text.
pub fn split_category(message: &str) -> Option<(&str, &str)> {
    let rest = message.strip_prefix('[')?;
    let (tag, tail) = rest.split_once(']')?;
    if tag.is_empty() || tag.contains(char::is_whitespace) {
        return None;
    }
    Some((tag, tail.trim_start()))
}

struct FieldVisitor<'a>(&'a mut Map<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(f: impl FnOnce()) -> Vec<DiagnosticEntry> {
        let (layer, mut rx) = DiagnosticLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);

        let mut entries = Vec::new();
        while let Ok(entry) = rx.try_recv() {
            entries.push(entry);
        }
        entries
    }

    #[test]
    fn test_split_category() {
        assert_eq!(split_category("[Speech] Started"), Some(("Speech", "Started")));
        assert_eq!(split_category("[History]"), Some(("History", "")));
        assert_eq!(split_category("no tag"), None);
        assert_eq!(split_category("[two words] x"), None);
        assert_eq!(split_category("[] x"), None);
    }

    #[test]
    fn test_event_becomes_entry_with_fields() {
        let entries = capture(|| {
            tracing::warn!(target: "parley_core::speech", attempt = 2u64, code = "network", "[Speech] Recognition error");
        });

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.category, "Speech");
        assert_eq!(entry.message, "Recognition error");
        assert_eq!(entry.data["attempt"], serde_json::json!(2));
        assert_eq!(entry.data["code"], serde_json::json!("network"));
    }

    #[test]
    fn test_untagged_event_uses_target_and_null_data() {
        let entries = capture(|| {
            tracing::info!(target: "parley_cli", "plain line");
        });
        assert_eq!(entries[0].category, "parley_cli");
        assert_eq!(entries[0].message, "plain line");
        assert!(entries[0].data.is_null());
    }

    #[test]
    fn test_debug_and_own_events_are_skipped() {
        let entries = capture(|| {
            tracing::debug!(target: "parley_application", "[Runtime] Tick");
            tracing::error!(target: "parley_diagnostics::batcher", "[Diagnostics] Flush failed");
            tracing::info!(target: "parley_application", "[Runtime] Ready");
        });
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Ready");
    }
}
