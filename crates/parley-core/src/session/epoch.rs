//! Monotonic generation counter.

use serde::{Deserialize, Serialize};

/// A generation number that advances whenever the state it guards is reset.
///
/// Requests are tagged with the epoch current at issue time; a completion
/// carrying an older epoch belongs to superseded state and is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to the next generation and returns it.
    pub fn bump(&mut self) -> Epoch {
        self.0 += 1;
        *self
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}
