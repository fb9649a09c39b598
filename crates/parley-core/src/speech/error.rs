//! Speech platform error taxonomy.

use serde::{Deserialize, Serialize};

/// Classified platform error condition. Every kind ends the recording.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechErrorKind {
    /// Microphone or recognition permission refused.
    PermissionDenied,
    /// Nothing was heard. Normal operation, not surfaced.
    NoSpeech,
    /// The session was aborted. Not surfaced.
    Aborted,
    Network,
    ServiceUnavailable,
    /// Any other platform code.
    Other(String),
}

impl SpeechErrorKind {
    /// Maps a platform error code (Web Speech API naming) to a kind.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "permission-denied" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "network" => Self::Network,
            "service-not-allowed" | "service-unavailable" => Self::ServiceUnavailable,
            other => Self::Other(other.to_string()),
        }
    }

    /// Notice shown to the user, or `None` for silent kinds.
    pub fn user_notice(&self) -> Option<String> {
        match self {
            Self::PermissionDenied => Some(
                "Microphone access was denied. Allow microphone access to use voice input."
                    .to_string(),
            ),
            Self::NoSpeech | Self::Aborted => None,
            Self::Network => Some("Voice input failed because of a network error.".to_string()),
            Self::ServiceUnavailable => {
                Some("The speech recognition service is unavailable.".to_string())
            }
            Self::Other(code) => Some(format!("Voice input error: {code}")),
        }
    }
}

impl std::fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::NoSpeech => write!(f, "no speech"),
            Self::Aborted => write!(f, "aborted"),
            Self::Network => write!(f, "network"),
            Self::ServiceUnavailable => write!(f, "service unavailable"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Why the platform refused to start recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRejection {
    /// A recognition session is already running on the platform.
    AlreadyActive,
    Failed(String),
}
