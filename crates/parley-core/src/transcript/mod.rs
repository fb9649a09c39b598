//! Transcript domain module.
//!
//! The transcript is the ordered log of rendered entries shared by the
//! speech, exchange and history components.
//!
//! # Module Structure
//!
//! - `entry`: entry types (`TranscriptEntry`, `EntryRole`, `EntryPosition`)
//! - `buffer`: the append/prepend log (`TranscriptBuffer`)

mod buffer;
mod entry;

// Re-export public API
pub use buffer::TranscriptBuffer;
pub use entry::{EntryDraft, EntryId, EntryPosition, EntryRole, TranscriptEntry};
