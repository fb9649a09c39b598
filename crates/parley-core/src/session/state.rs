//! Shared conversation session state.

use super::epoch::Epoch;
use super::model::{AgentSummary, ConversationSession, Identity};

/// State shared by the exchange and history components.
///
/// Two generation counters guard asynchronous results. The session epoch
/// advances only when a different session becomes active and gates exchange
/// results. The view epoch also advances on a verbose toggle, which rebuilds
/// the transcript, and gates history pages.
#[derive(Debug, Default)]
pub struct SessionState {
    current: Option<ConversationSession>,
    verbose: bool,
    identity: Identity,
    agents: Vec<AgentSummary>,
    epoch: Epoch,
    view_epoch: Epoch,
}

impl SessionState {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<&ConversationSession> {
        self.current.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Generation of the active session.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Generation of the rendered transcript.
    pub fn view_epoch(&self) -> Epoch {
        self.view_epoch
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    pub fn agents(&self) -> &[AgentSummary] {
        &self.agents
    }

    pub fn set_agents(&mut self, agents: Vec<AgentSummary>) {
        self.agents = agents;
    }

    /// Replaces the active session.
    ///
    /// Returns the new view epoch, or `None` when `session` is already active.
    pub fn activate(&mut self, session: ConversationSession) -> Option<Epoch> {
        if self.current.as_ref() == Some(&session) {
            return None;
        }
        tracing::info!("[Session] Activating {}", session);
        self.current = Some(session);
        self.epoch.bump();
        Some(self.view_epoch.bump())
    }

    /// Sets the verbose flag. Returns the new view epoch if it changed.
    ///
    /// The session epoch is untouched: a reply to an outstanding send still
    /// belongs to this session.
    pub fn set_verbose(&mut self, verbose: bool) -> Option<Epoch> {
        if self.verbose == verbose {
            return None;
        }
        self.verbose = verbose;
        Some(self.view_epoch.bump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_same_session_is_noop() {
        let mut state = SessionState::new(false);
        let session = ConversationSession::new("agent-1", None).unwrap();

        let first = state.activate(session.clone()).unwrap();
        let session_epoch = state.epoch();
        assert!(state.activate(session).is_none());
        assert_eq!(state.view_epoch(), first);
        assert_eq!(state.epoch(), session_epoch);

        let other = ConversationSession::new("agent-2", None).unwrap();
        assert!(state.activate(other).unwrap() > first);
        assert!(state.epoch() > session_epoch);
    }

    #[test]
    fn test_verbose_toggle_bumps_only_view_epoch() {
        let mut state = SessionState::new(false);
        state.activate(ConversationSession::new("agent-1", None).unwrap());
        let session_epoch = state.epoch();

        assert!(state.set_verbose(false).is_none());
        let view = state.set_verbose(true).unwrap();
        assert_eq!(state.view_epoch(), view);
        assert_eq!(state.epoch(), session_epoch);
        assert!(state.verbose());
    }
}
