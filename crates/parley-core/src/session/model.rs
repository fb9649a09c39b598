//! Conversation scope and service descriptors.

use serde::{Deserialize, Serialize};

/// The agent (and optional project/workspace scope) the user is talking to.
///
/// At most one session is active per controller. Sessions are never
/// destroyed, only replaced; replacing one invalidates the transcript and
/// resets history paging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Agent identifier as known to the agent service
    pub agent_id: String,
    /// Optional project/workspace scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl ConversationSession {
    /// Builds a session, trimming the identifiers and treating blank input
    /// as absent. Returns `None` for a blank agent identifier.
    pub fn new(agent_id: impl AsRef<str>, project_id: Option<&str>) -> Option<Self> {
        let agent_id = agent_id.as_ref().trim();
        if agent_id.is_empty() {
            return None;
        }

        let project_id = project_id
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Some(Self {
            agent_id: agent_id.to_string(),
            project_id,
        })
    }
}

impl std::fmt::Display for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.project_id {
            Some(project) => write!(f, "{}@{}", self.agent_id, project),
            None => write!(f, "{}", self.agent_id),
        }
    }
}

/// Entry in the agent directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AgentSummary {
    /// Display name, falling back to the identifier.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// One labelled block of an agent's persistent memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBlock {
    #[serde(default = "unknown_label")]
    pub label: String,
    #[serde(default)]
    pub value: String,
    /// Character budget of the block, when the service reports one.
    #[serde(default)]
    pub limit: Option<u64>,
}

fn unknown_label() -> String {
    "unknown".to_string()
}

impl MemoryBlock {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            limit: None,
        }
    }

    /// The value cut to at most `max_chars` characters.
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.value.char_indices().nth(max_chars) {
            Some((index, _)) => &self.value[..index],
            None => &self.value,
        }
    }
}

/// Authenticated user as reported by the identity endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescriptor {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Result of asking the service who the current user is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    Authenticated(UserDescriptor),
    /// The service supports identity but nobody is logged in.
    Anonymous,
    /// The deployment has no identity capability at all.
    #[default]
    NotConfigured,
}

impl Identity {
    pub fn user(&self) -> Option<&UserDescriptor> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Deployment defaults published by the service's configuration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceDefaults {
    #[serde(default)]
    pub default_agent_id: Option<String>,
    #[serde(default)]
    pub default_project_id: Option<String>,
}

impl ServiceDefaults {
    /// The session to activate at boot, if the deployment names one.
    pub fn default_session(&self) -> Option<ConversationSession> {
        let agent_id = self.default_agent_id.as_deref()?;
        ConversationSession::new(agent_id, self.default_project_id.as_deref())
    }
}
