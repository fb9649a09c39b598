//! Single-flight submission pipeline.

use chrono::Utc;
use uuid::Uuid;

use super::request::{PendingRequest, RequestStatus, SendRequest, SendResponse, StreamChunk};
use crate::error::ParleyError;
use crate::message::{MessageOrigin, render_messages, to_draft};
use crate::session::{ConversationSession, Epoch};
use crate::transcript::{EntryId, EntryRole, TranscriptBuffer};

pub const LOADING_TEXT: &str = "Thinking...";
pub const NO_CONTENT_TEXT: &str = "No message content.";
const WAITING_TEXT: &str = "Still working on the previous request...";
const SELECT_AGENT_NOTICE: &str = "Please select an agent before sending a message.";
const CONNECTION_CLOSED: &str = "The connection closed before the agent answered.";

/// Why a submission was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyText,
    /// No conversation session is active. A notice was added to the transcript.
    NoSession,
    /// Another submission is still outstanding.
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    /// More progressive chunks are expected.
    Streaming,
    /// The key is held by an earlier request. Poll again with the same key.
    AwaitingOriginal,
    Completed,
    Failed,
    /// The result belonged to a superseded session or an unknown key.
    Discarded,
}

/// What the caller has to do after feeding a result into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub status: ExchangeStatus,
    pub transcript_changed: bool,
    /// The service acknowledged the submission; the composition can go.
    pub clear_composition: bool,
}

impl ExchangeOutcome {
    fn new(status: ExchangeStatus, transcript_changed: bool) -> Self {
        Self {
            status,
            transcript_changed,
            clear_composition: false,
        }
    }

    fn acknowledged(mut self, clear: bool) -> Self {
        self.clear_composition = clear;
        self
    }

    /// The submission is no longer outstanding.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ExchangeStatus::Completed | ExchangeStatus::Failed | ExchangeStatus::Discarded
        )
    }
}

#[derive(Debug, Clone)]
struct FailedAttempt {
    session: ConversationSession,
    text: String,
    key: String,
}

/// Owns the one outstanding submission and its loading placeholder.
#[derive(Debug, Default)]
pub struct ExchangePipeline {
    pending: Option<PendingRequest>,
    loading: Option<EntryId>,
    acknowledged: bool,
    awaiting_original: bool,
    rendered: usize,
    last_failed: Option<FailedAttempt>,
}

impl ExchangePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Validates and issues a submission.
    ///
    /// On acceptance the user entry and the loading placeholder are appended
    /// and the request to send is returned. Resubmitting the text of the last
    /// failed attempt in the same session reuses its idempotency key.
    pub fn submit(
        &mut self,
        text: &str,
        session: Option<&ConversationSession>,
        epoch: Epoch,
        verbose: bool,
        transcript: &mut TranscriptBuffer,
    ) -> Result<SendRequest, SubmitRejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitRejection::EmptyText);
        }
        let Some(session) = session else {
            transcript.push(EntryRole::System, SELECT_AGENT_NOTICE);
            return Err(SubmitRejection::NoSession);
        };
        if self.pending.is_some() {
            tracing::debug!("[Exchange] Submission rejected: another request is in flight");
            return Err(SubmitRejection::InFlight);
        }

        let idempotency_key = match self.last_failed.take() {
            Some(failed) if failed.session == *session && failed.text == text => {
                tracing::info!("[Exchange] Resubmitting failed attempt with key {}", failed.key);
                failed.key
            }
            _ => Uuid::new_v4().to_string(),
        };

        let request = SendRequest {
            session: session.clone(),
            text: text.to_string(),
            idempotency_key,
            verbose,
        };

        transcript.push(EntryRole::User, text);
        self.loading = Some(transcript.push(EntryRole::Loading, LOADING_TEXT));
        self.pending = Some(PendingRequest {
            request: request.clone(),
            submitted_at: Utc::now(),
            status: RequestStatus::InFlight,
            epoch,
        });
        self.acknowledged = false;
        self.awaiting_original = false;
        self.rendered = 0;

        tracing::info!(
            "[Exchange] Submitted to {} (key: {})",
            session,
            request.idempotency_key
        );
        Ok(request)
    }

    /// Puts the loading placeholder back after the transcript was rebuilt
    /// under the same session. Returns true if an entry was added.
    pub fn restore_placeholder(&mut self, current_epoch: Epoch, transcript: &mut TranscriptBuffer) -> bool {
        let current = self.pending.as_ref().is_some_and(|p| p.epoch == current_epoch);
        let Some(id) = self.loading.filter(|_| current) else {
            return false;
        };
        if transcript.contains(id) {
            return false;
        }
        let text = if self.awaiting_original { WAITING_TEXT } else { LOADING_TEXT };
        self.loading = Some(transcript.push(EntryRole::Loading, text));
        true
    }

    /// The outstanding request, for a re-poll after an in-flight answer.
    pub fn repoll_request(&mut self) -> Option<SendRequest> {
        let pending = self.pending.as_ref()?;
        self.awaiting_original = false;
        Some(pending.request.clone())
    }

    /// Handles the terminal result of an atomic send.
    pub fn on_response(
        &mut self,
        key: &str,
        result: Result<SendResponse, ParleyError>,
        current_epoch: Epoch,
        transcript: &mut TranscriptBuffer,
    ) -> ExchangeOutcome {
        let Some((stale, verbose)) = self.lookup(key, current_epoch) else {
            return ExchangeOutcome::new(ExchangeStatus::Discarded, false);
        };

        match result {
            Ok(SendResponse::InFlight) => self.await_original(stale, transcript),
            Ok(SendResponse::Messages(messages)) => {
                if stale {
                    return self.discard(RequestStatus::Completed);
                }
                self.clear_loading(transcript);
                for draft in render_messages(&messages, verbose, MessageOrigin::Live) {
                    if transcript.append(draft).is_some() {
                        self.rendered += 1;
                    }
                }
                self.complete(verbose, transcript).acknowledged(true)
            }
            Err(error) => self.fail(&error.user_message(), stale, transcript),
        }
    }

    /// Handles one progressive chunk.
    pub fn on_chunk(
        &mut self,
        key: &str,
        chunk: StreamChunk,
        current_epoch: Epoch,
        transcript: &mut TranscriptBuffer,
    ) -> ExchangeOutcome {
        let Some((stale, verbose)) = self.lookup(key, current_epoch) else {
            return ExchangeOutcome::new(ExchangeStatus::Discarded, false);
        };

        match chunk {
            StreamChunk::Chunk { message } => {
                let first_ack = !self.acknowledged;
                self.acknowledged = true;
                if stale {
                    // Still outstanding; keep the single-flight lock.
                    return ExchangeOutcome::new(ExchangeStatus::Streaming, false);
                }
                let mut changed = self.clear_loading(transcript);
                if let Some(draft) = to_draft(&message, verbose, MessageOrigin::Live)
                    && transcript.append(draft).is_some()
                {
                    self.rendered += 1;
                    changed = true;
                }
                ExchangeOutcome::new(ExchangeStatus::Streaming, changed).acknowledged(first_ack)
            }
            StreamChunk::Done => {
                let first_ack = !self.acknowledged;
                if stale {
                    return self.discard(RequestStatus::Completed);
                }
                self.clear_loading(transcript);
                self.complete(verbose, transcript).acknowledged(first_ack)
            }
            StreamChunk::InFlight => self.await_original(stale, transcript),
            StreamChunk::Error { error } => {
                self.fail(&format!("The agent reported an error: {error}"), stale, transcript)
            }
        }
    }

    /// Handles the end of a progressive connection, or a failure to open it.
    ///
    /// Returns `None` when the close needs no action (the exchange already
    /// finished or is waiting on an earlier request).
    pub fn on_stream_closed(
        &mut self,
        key: &str,
        error: Option<ParleyError>,
        current_epoch: Epoch,
        transcript: &mut TranscriptBuffer,
    ) -> Option<ExchangeOutcome> {
        let (stale, verbose) = self.lookup(key, current_epoch)?;
        if self.awaiting_original && error.is_none() {
            return None;
        }

        if let Some(error) = error {
            return Some(self.fail(&error.user_message(), stale, transcript));
        }
        if !self.acknowledged {
            return Some(self.fail(CONNECTION_CLOSED, stale, transcript));
        }

        tracing::warn!("[Exchange] Stream for {} closed without a done marker", key);
        if stale {
            return Some(self.discard(RequestStatus::Completed));
        }
        self.clear_loading(transcript);
        Some(self.complete(verbose, transcript))
    }

    /// `(stale, verbose)` for the pending request with `key`.
    fn lookup(&self, key: &str, current_epoch: Epoch) -> Option<(bool, bool)> {
        let pending = self.pending.as_ref().filter(|p| p.key() == key)?;
        Some((pending.epoch != current_epoch, pending.request.verbose))
    }

    fn clear_loading(&mut self, transcript: &mut TranscriptBuffer) -> bool {
        self.loading
            .take()
            .and_then(|id| transcript.remove(id))
            .is_some()
    }

    fn await_original(&mut self, stale: bool, transcript: &mut TranscriptBuffer) -> ExchangeOutcome {
        self.awaiting_original = true;
        let changed = !stale
            && self
                .loading
                .is_some_and(|id| transcript.update_text(id, WAITING_TEXT));
        tracing::info!("[Exchange] Request still in flight on the service, waiting");
        ExchangeOutcome::new(ExchangeStatus::AwaitingOriginal, changed)
    }

    fn complete(&mut self, verbose: bool, transcript: &mut TranscriptBuffer) -> ExchangeOutcome {
        if self.rendered == 0 && !verbose {
            transcript.push(EntryRole::System, NO_CONTENT_TEXT);
        }
        self.settle(RequestStatus::Completed);
        self.last_failed = None;
        ExchangeOutcome::new(ExchangeStatus::Completed, true)
    }

    fn fail(&mut self, message: &str, stale: bool, transcript: &mut TranscriptBuffer) -> ExchangeOutcome {
        tracing::warn!("[Exchange] Submission failed: {}", message);
        if let Some(pending) = &self.pending {
            self.last_failed = Some(FailedAttempt {
                session: pending.request.session.clone(),
                text: pending.request.text.clone(),
                key: pending.request.idempotency_key.clone(),
            });
        }
        if stale {
            return self.discard(RequestStatus::Failed);
        }
        self.clear_loading(transcript);
        transcript.push(EntryRole::System, format!("Error: {message}"));
        self.settle(RequestStatus::Failed);
        ExchangeOutcome::new(ExchangeStatus::Failed, true)
    }

    fn discard(&mut self, status: RequestStatus) -> ExchangeOutcome {
        tracing::debug!("[Exchange] Dropping result for a superseded session");
        self.settle(status);
        ExchangeOutcome::new(ExchangeStatus::Discarded, false)
    }

    fn settle(&mut self, status: RequestStatus) {
        if let Some(mut pending) = self.pending.take() {
            pending.status = status;
            tracing::debug!(
                "[Exchange] Request {} settled as {:?}",
                pending.key(),
                pending.status
            );
        }
        self.loading = None;
        self.acknowledged = false;
        self.awaiting_original = false;
        self.rendered = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::AgentMessage;

    fn session() -> ConversationSession {
        ConversationSession::new("agent-1", None).unwrap()
    }

    fn submit(pipeline: &mut ExchangePipeline, transcript: &mut TranscriptBuffer, text: &str) -> SendRequest {
        pipeline
            .submit(text, Some(&session()), Epoch::new(), false, transcript)
            .unwrap()
    }

    #[test]
    fn test_placeholder_restored_only_for_current_session() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        submit(&mut pipeline, &mut transcript, "Hi");

        transcript.clear();
        let mut superseded = Epoch::new();
        assert!(!pipeline.restore_placeholder(superseded.bump(), &mut transcript));
        assert!(transcript.is_empty());

        assert!(pipeline.restore_placeholder(Epoch::new(), &mut transcript));
        assert!(!pipeline.restore_placeholder(Epoch::new(), &mut transcript));
        assert_eq!(transcript.snapshot(), vec![(EntryRole::Loading, LOADING_TEXT.to_string())]);
    }

    #[test]
    fn test_submit_without_session_renders_notice() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();

        let result = pipeline.submit("Hello", None, Epoch::new(), false, &mut transcript);
        assert_eq!(result, Err(SubmitRejection::NoSession));
        assert!(!pipeline.is_in_flight());
        let (role, text) = &transcript.snapshot()[0];
        assert_eq!(*role, EntryRole::System);
        assert!(text.contains("select an agent"));
    }

    #[test]
    fn test_atomic_success_replaces_loading() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        let request = submit(&mut pipeline, &mut transcript, "Hi");

        assert_eq!(
            transcript.snapshot(),
            vec![
                (EntryRole::User, "Hi".to_string()),
                (EntryRole::Loading, LOADING_TEXT.to_string()),
            ]
        );

        let outcome = pipeline.on_response(
            &request.idempotency_key,
            Ok(SendResponse::Messages(vec![AgentMessage::assistant("a1", "Hello!")])),
            Epoch::new(),
            &mut transcript,
        );
        assert_eq!(outcome.status, ExchangeStatus::Completed);
        assert!(outcome.clear_composition);
        assert_eq!(
            transcript.snapshot(),
            vec![
                (EntryRole::User, "Hi".to_string()),
                (EntryRole::Agent, "Hello!".to_string()),
            ]
        );
        assert!(!pipeline.is_in_flight());
    }

    #[test]
    fn test_single_flight_and_empty_rejections() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        submit(&mut pipeline, &mut transcript, "first");

        let second = pipeline.submit("second", Some(&session()), Epoch::new(), false, &mut transcript);
        assert_eq!(second, Err(SubmitRejection::InFlight));
        let blank = pipeline.submit("   ", Some(&session()), Epoch::new(), false, &mut transcript);
        assert_eq!(blank, Err(SubmitRejection::EmptyText));
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_reasoning_only_response_gets_placeholder() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        let request = submit(&mut pipeline, &mut transcript, "Hi");

        pipeline.on_response(
            &request.idempotency_key,
            Ok(SendResponse::Messages(vec![AgentMessage::reasoning("r1", "hmm")])),
            Epoch::new(),
            &mut transcript,
        );
        assert_eq!(
            transcript.snapshot()[1..],
            [(EntryRole::System, NO_CONTENT_TEXT.to_string())]
        );
    }

    #[test]
    fn test_failure_keeps_composition_and_reuses_key() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        let request = submit(&mut pipeline, &mut transcript, "Hi");

        let outcome = pipeline.on_response(
            &request.idempotency_key,
            Err(ParleyError::transport("connection refused")),
            Epoch::new(),
            &mut transcript,
        );
        assert_eq!(outcome.status, ExchangeStatus::Failed);
        assert!(!outcome.clear_composition);
        let roles: Vec<EntryRole> = transcript.snapshot().into_iter().map(|(r, _)| r).collect();
        assert_eq!(roles, vec![EntryRole::User, EntryRole::System]);

        let retry = submit(&mut pipeline, &mut transcript, "Hi");
        assert_eq!(retry.idempotency_key, request.idempotency_key);
    }

    #[test]
    fn test_in_flight_is_a_wait_state() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        let request = submit(&mut pipeline, &mut transcript, "Hi");

        let outcome = pipeline.on_response(
            &request.idempotency_key,
            Ok(SendResponse::InFlight),
            Epoch::new(),
            &mut transcript,
        );
        assert_eq!(outcome.status, ExchangeStatus::AwaitingOriginal);
        assert!(pipeline.is_in_flight());
        assert_eq!(transcript.last().unwrap().role, EntryRole::Loading);

        let repoll = pipeline.repoll_request().unwrap();
        assert_eq!(repoll.idempotency_key, request.idempotency_key);
    }

    #[test]
    fn test_progressive_clears_composition_on_first_chunk() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        let request = submit(&mut pipeline, &mut transcript, "Hi");
        let key = request.idempotency_key.as_str();

        let first = pipeline.on_chunk(
            key,
            StreamChunk::Chunk {
                message: AgentMessage::reasoning("r1", "thinking"),
            },
            Epoch::new(),
            &mut transcript,
        );
        assert!(first.clear_composition);
        assert_eq!(first.status, ExchangeStatus::Streaming);
        // Loading is gone even though the reasoning chunk is hidden.
        assert_eq!(transcript.len(), 1);

        let second = pipeline.on_chunk(
            key,
            StreamChunk::Chunk {
                message: AgentMessage::assistant("a1", "Hello!"),
            },
            Epoch::new(),
            &mut transcript,
        );
        assert!(!second.clear_composition);

        let done = pipeline.on_chunk(key, StreamChunk::Done, Epoch::new(), &mut transcript);
        assert_eq!(done.status, ExchangeStatus::Completed);
        assert!(!done.clear_composition);
        assert_eq!(transcript.last().unwrap().text, "Hello!");
        assert!(pipeline.on_stream_closed(key, None, Epoch::new(), &mut transcript).is_none());
    }

    #[test]
    fn test_stale_results_are_discarded_but_hold_the_lock() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        let mut epoch = Epoch::new();
        let request = pipeline
            .submit("Hi", Some(&session()), epoch, false, &mut transcript)
            .unwrap();

        // Session switch.
        let current = epoch.bump();
        transcript.clear();

        let outcome = pipeline.on_response(
            &request.idempotency_key,
            Ok(SendResponse::InFlight),
            current,
            &mut transcript,
        );
        assert_eq!(outcome.status, ExchangeStatus::AwaitingOriginal);
        assert!(pipeline.is_in_flight());

        let outcome = pipeline.on_response(
            &request.idempotency_key,
            Ok(SendResponse::Messages(vec![AgentMessage::assistant("a1", "late")])),
            current,
            &mut transcript,
        );
        assert_eq!(outcome.status, ExchangeStatus::Discarded);
        assert!(transcript.is_empty());
        assert!(!pipeline.is_in_flight());
    }

    #[test]
    fn test_stream_error_and_early_close() {
        let mut pipeline = ExchangePipeline::new();
        let mut transcript = TranscriptBuffer::new();
        let request = submit(&mut pipeline, &mut transcript, "Hi");
        let outcome = pipeline.on_chunk(
            &request.idempotency_key,
            StreamChunk::Error {
                error: "boom".to_string(),
            },
            Epoch::new(),
            &mut transcript,
        );
        assert_eq!(outcome.status, ExchangeStatus::Failed);
        assert!(transcript.last().unwrap().text.contains("boom"));

        let request = submit(&mut pipeline, &mut transcript, "Again");
        let outcome = pipeline
            .on_stream_closed(&request.idempotency_key, None, Epoch::new(), &mut transcript)
            .unwrap();
        assert_eq!(outcome.status, ExchangeStatus::Failed);
        assert!(!pipeline.is_in_flight());
    }
}
