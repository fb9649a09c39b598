//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: the active conversation scope (`ConversationSession`) and the
//!   directory/identity descriptors returned by the agent service
//! - `epoch`: generation counter used to drop responses from superseded scopes
//! - `state`: the active session, display mode and directory (`SessionState`)

mod epoch;
mod model;
mod state;

// Re-export public API
pub use epoch::Epoch;
pub use model::{
    AgentSummary, ConversationSession, Identity, MemoryBlock, ServiceDefaults, UserDescriptor,
};
pub use state::SessionState;
