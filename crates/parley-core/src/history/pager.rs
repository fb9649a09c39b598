//! Backward, cursor-paginated history loading.

use serde::Deserialize;

use super::cursor::HistoryCursor;
use super::scroll::ScrollMetrics;
use crate::config::ClientConfig;
use crate::error::ParleyError;
use crate::message::{AgentMessage, MessageOrigin, render_messages};
use crate::session::{ConversationSession, Epoch};
use crate::transcript::TranscriptBuffer;

/// Parameters of one history fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub session: ConversationSession,
    pub limit: usize,
    /// Only entries strictly older than this id. `None` means the newest page.
    pub before: Option<String>,
}

/// A query tagged with the session epoch it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub query: HistoryQuery,
    pub epoch: Epoch,
}

impl HistoryRequest {
    pub fn is_initial(&self) -> bool {
        self.query.before.is_none()
    }
}

/// One page as returned by the service, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub oldest_id: Option<String>,
}

/// Result of merging a page into the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOutcome {
    pub inserted: usize,
    /// The page was the newest one for a freshly activated session.
    pub initial: bool,
}

#[derive(Debug)]
pub struct HistoryPager {
    cursor: HistoryCursor,
    page_size: usize,
    threshold_px: f64,
    cooling_down: bool,
}

impl HistoryPager {
    pub fn new(page_size: usize, threshold_px: f64) -> Self {
        Self {
            cursor: HistoryCursor::default(),
            page_size: page_size.max(1),
            threshold_px,
            cooling_down: false,
        }
    }

    pub fn cursor(&self) -> &HistoryCursor {
        &self.cursor
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooling_down
    }

    /// Forgets everything about the previous session.
    pub fn reset(&mut self) {
        self.cursor.reset();
        self.cooling_down = false;
    }

    /// The newest page for a freshly activated session.
    pub fn initial_request(&mut self, session: &ConversationSession, epoch: Epoch) -> HistoryRequest {
        self.cursor.loading = true;
        HistoryRequest {
            query: HistoryQuery {
                session: session.clone(),
                limit: self.page_size,
                before: None,
            },
            epoch,
        }
    }

    /// Whether a scroll position should load an older page.
    pub fn should_trigger(&self, metrics: &ScrollMetrics, session_active: bool) -> bool {
        metrics.near_top(self.threshold_px) && self.can_load_older(session_active)
    }

    fn can_load_older(&self, session_active: bool) -> bool {
        session_active && self.cursor.has_more && !self.cursor.loading && !self.cooling_down
    }

    /// Handles a scroll observation. On a trigger the cool-down starts; the
    /// caller ends it with [`HistoryPager::end_cooldown`] once it elapses.
    pub fn on_scroll(
        &mut self,
        metrics: &ScrollMetrics,
        session: Option<&ConversationSession>,
        epoch: Epoch,
    ) -> Option<HistoryRequest> {
        if !metrics.near_top(self.threshold_px) {
            return None;
        }
        let request = self.request_older(session, epoch)?;
        self.cooling_down = true;
        Some(request)
    }

    /// Requests the page before the current boundary, regardless of scroll
    /// position. Without a boundary (the initial load failed) the newest
    /// page is requested again.
    pub fn request_older(
        &mut self,
        session: Option<&ConversationSession>,
        epoch: Epoch,
    ) -> Option<HistoryRequest> {
        let session = session.filter(|_| self.can_load_older(true))?;
        if self.cursor.oldest_seen_id.is_none() {
            tracing::debug!("[History] No page loaded yet for {}, retrying the initial load", session);
            return Some(self.initial_request(session, epoch));
        }
        self.cursor.loading = true;
        tracing::debug!(
            "[History] Loading page before {:?}",
            self.cursor.oldest_seen_id
        );
        Some(HistoryRequest {
            query: HistoryQuery {
                session: session.clone(),
                limit: self.page_size,
                before: self.cursor.oldest_seen_id.clone(),
            },
            epoch,
        })
    }

    pub fn end_cooldown(&mut self) {
        self.cooling_down = false;
    }

    /// Merges a fetched page above the transcript head.
    ///
    /// Returns `None` when nothing was merged: the request belonged to a
    /// superseded session, the fetch failed (logged only), or the cursor had
    /// moved on.
    pub fn on_page(
        &mut self,
        request: &HistoryRequest,
        result: Result<HistoryPage, ParleyError>,
        current_epoch: Epoch,
        verbose: bool,
        transcript: &mut TranscriptBuffer,
    ) -> Option<PageOutcome> {
        if request.epoch != current_epoch {
            tracing::debug!("[History] Dropping page for a superseded session");
            return None;
        }
        self.cursor.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    "[History] Failed to load history for {}: {}",
                    request.query.session,
                    e
                );
                return None;
            }
        };

        let oldest_id = page
            .oldest_id
            .clone()
            .or_else(|| page.messages.last().and_then(AgentMessage::id).map(str::to_string));
        let has_more = page.has_more && !page.messages.is_empty();
        if !self
            .cursor
            .advance(request.query.before.as_deref(), oldest_id, has_more)
        {
            tracing::debug!("[History] Cursor moved since request, dropping page");
            return None;
        }

        let oldest_first: Vec<AgentMessage> = page.messages.into_iter().rev().collect();
        let drafts = render_messages(&oldest_first, verbose, MessageOrigin::History);
        let inserted = transcript.prepend_block(drafts);

        tracing::debug!(
            "[History] Prepended {} entries (has_more: {})",
            inserted,
            self.cursor.has_more
        );
        Some(PageOutcome {
            inserted,
            initial: request.is_initial(),
        })
    }
}

impl From<&ClientConfig> for HistoryPager {
    fn from(config: &ClientConfig) -> Self {
        Self::new(config.page_size, config.scroll_threshold_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::EntryRole;

    fn session() -> ConversationSession {
        ConversationSession::new("agent-1", Some("proj")).unwrap()
    }

    fn top() -> ScrollMetrics {
        ScrollMetrics::new(0.0, 2_000.0, 600.0)
    }

    fn page(range: std::ops::RangeInclusive<u32>, has_more: bool) -> HistoryPage {
        let messages: Vec<AgentMessage> = range
            .rev()
            .map(|n| AgentMessage::assistant(format!("m{n}"), format!("message {n}")))
            .collect();
        let oldest_id = messages.last().and_then(AgentMessage::id).map(str::to_string);
        HistoryPage {
            messages,
            has_more,
            oldest_id,
        }
    }

    fn loaded_pager(transcript: &mut TranscriptBuffer) -> HistoryPager {
        let mut pager = HistoryPager::new(10, 50.0);
        let request = pager.initial_request(&session(), Epoch::new());
        pager
            .on_page(&request, Ok(page(100..=109, true)), Epoch::new(), false, transcript)
            .unwrap();
        pager
    }

    #[test]
    fn test_older_page_is_prepended_oldest_first() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = loaded_pager(&mut transcript);
        assert_eq!(pager.cursor().oldest_seen_id.as_deref(), Some("m100"));

        let request = pager.on_scroll(&top(), Some(&session()), Epoch::new()).unwrap();
        assert_eq!(request.query.before.as_deref(), Some("m100"));
        assert_eq!(request.query.limit, 10);

        let outcome = pager
            .on_page(&request, Ok(page(95..=99, true)), Epoch::new(), false, &mut transcript)
            .unwrap();
        assert_eq!(outcome.inserted, 5);
        assert!(!outcome.initial);
        assert_eq!(pager.cursor().oldest_seen_id.as_deref(), Some("m95"));

        let texts: Vec<String> = transcript.snapshot().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts[..6], ["message 95", "message 96", "message 97", "message 98", "message 99", "message 100"]);
    }

    #[test]
    fn test_trigger_requires_all_conditions() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = loaded_pager(&mut transcript);

        assert!(!pager.should_trigger(&ScrollMetrics::new(300.0, 2_000.0, 600.0), true));
        assert!(!pager.should_trigger(&top(), false));
        assert!(pager.should_trigger(&top(), true));

        let request = pager.on_scroll(&top(), Some(&session()), Epoch::new()).unwrap();
        // Loading and cooling down.
        assert!(pager.on_scroll(&top(), Some(&session()), Epoch::new()).is_none());

        pager.on_page(&request, Ok(page(95..=99, false)), Epoch::new(), false, &mut transcript);
        assert!(pager.is_cooling_down());
        pager.end_cooldown();
        // No more history.
        assert!(!pager.should_trigger(&top(), true));
    }

    #[test]
    fn test_failed_fetch_releases_loading_flag() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = loaded_pager(&mut transcript);
        let request = pager.on_scroll(&top(), Some(&session()), Epoch::new()).unwrap();

        let outcome = pager.on_page(
            &request,
            Err(ParleyError::transport("timeout")),
            Epoch::new(),
            false,
            &mut transcript,
        );
        assert!(outcome.is_none());
        assert!(!pager.cursor().loading);
        assert_eq!(pager.cursor().oldest_seen_id.as_deref(), Some("m100"));
    }

    #[test]
    fn test_failed_initial_load_is_retried_on_scroll() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = HistoryPager::new(10, 50.0);
        let request = pager.initial_request(&session(), Epoch::new());
        pager.on_page(
            &request,
            Err(ParleyError::transport("connection refused")),
            Epoch::new(),
            false,
            &mut transcript,
        );

        let retry = pager.on_scroll(&top(), Some(&session()), Epoch::new()).unwrap();
        assert!(retry.is_initial());
        assert!(pager.request_older(Some(&session()), Epoch::new()).is_none());

        let outcome = pager
            .on_page(&retry, Ok(page(1..=3, false)), Epoch::new(), false, &mut transcript)
            .unwrap();
        assert!(outcome.initial);
        assert_eq!(transcript.len(), 3);
        pager.end_cooldown();
        assert!(pager.request_older(Some(&session()), Epoch::new()).is_none());
    }

    #[test]
    fn test_empty_history_does_not_reload() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = HistoryPager::new(10, 50.0);
        let request = pager.initial_request(&session(), Epoch::new());
        pager.on_page(&request, Ok(HistoryPage::default()), Epoch::new(), false, &mut transcript);
        assert!(pager.request_older(Some(&session()), Epoch::new()).is_none());
    }

    #[test]
    fn test_verbose_page_keeps_parts_sharing_an_id() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = HistoryPager::new(10, 50.0);
        let request = pager.initial_request(&session(), Epoch::new());
        let page = HistoryPage {
            messages: vec![
                AgentMessage::assistant("msg-1", "The answer"),
                AgentMessage::reasoning("msg-1", "thinking"),
            ],
            has_more: false,
            oldest_id: Some("msg-1".to_string()),
        };

        pager.on_page(&request, Ok(page), Epoch::new(), true, &mut transcript);
        assert_eq!(
            transcript.snapshot(),
            vec![
                (EntryRole::DebugReasoning, "thinking".to_string()),
                (EntryRole::Agent, "The answer".to_string()),
            ]
        );
    }

    #[test]
    fn test_stale_page_is_dropped_after_reset() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = HistoryPager::new(10, 50.0);
        let mut epoch = Epoch::new();
        let old = pager.initial_request(&session(), epoch);

        let current = epoch.bump();
        pager.reset();
        transcript.clear();
        let fresh = pager.initial_request(&session(), current);

        assert!(pager
            .on_page(&old, Ok(page(1..=3, false)), current, false, &mut transcript)
            .is_none());
        assert!(transcript.is_empty());
        // The fresh load is still outstanding.
        assert!(pager.cursor().loading);

        let outcome = pager
            .on_page(&fresh, Ok(page(4..=6, false)), current, false, &mut transcript)
            .unwrap();
        assert!(outcome.initial);
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_hidden_kinds_filtered_without_verbose() {
        let mut transcript = TranscriptBuffer::new();
        let mut pager = HistoryPager::new(10, 50.0);
        let request = pager.initial_request(&session(), Epoch::new());
        let page = HistoryPage {
            messages: vec![
                AgentMessage::assistant("m3", "answer"),
                AgentMessage::reasoning("m2", "thinking"),
                AgentMessage::user("m1", "question"),
            ],
            has_more: false,
            oldest_id: Some("m1".to_string()),
        };

        pager.on_page(&request, Ok(page), Epoch::new(), false, &mut transcript);
        let roles: Vec<EntryRole> = transcript.snapshot().into_iter().map(|(r, _)| r).collect();
        assert_eq!(roles, vec![EntryRole::User, EntryRole::Agent]);
    }
}
