//! History paging domain module.
//!
//! Lazily materializes older conversation entries as the user scrolls up.
//!
//! # Module Structure
//!
//! - `cursor`: position in server-held history (`HistoryCursor`)
//! - `scroll`: viewport measurements and anchoring (`ScrollMetrics`, `ScrollAnchor`)
//! - `pager`: trigger predicate, request issuing and page merging (`HistoryPager`)

mod cursor;
mod pager;
mod scroll;

// Re-export public API
pub use cursor::HistoryCursor;
pub use pager::{HistoryPage, HistoryPager, HistoryQuery, HistoryRequest, PageOutcome};
pub use scroll::{ScrollAnchor, ScrollMetrics};
