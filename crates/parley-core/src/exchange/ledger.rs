//! Idempotency bookkeeping.

use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Slot<T> {
    InFlight,
    Completed(T),
}

/// What a caller may do with a key it is about to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<T> {
    /// First sighting: perform the side effect, then `complete` or `abandon`.
    Fresh,
    /// The original is still running. Report "in flight", do nothing.
    InFlight,
    /// Already done: replay the cached result.
    Completed(T),
}

/// Server-side record guaranteeing at-most-once effects per key.
#[derive(Debug)]
pub struct IdempotencyLedger<T> {
    slots: HashMap<String, Slot<T>>,
}

impl<T> Default for IdempotencyLedger<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<T: Clone> IdempotencyLedger<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a key, marking it in flight on first sighting.
    pub fn begin(&mut self, key: &str) -> Admission<T> {
        match self.slots.get(key) {
            Some(Slot::InFlight) => Admission::InFlight,
            Some(Slot::Completed(result)) => Admission::Completed(result.clone()),
            None => {
                self.slots.insert(key.to_string(), Slot::InFlight);
                Admission::Fresh
            }
        }
    }

    /// Records the result of a key admitted as `Fresh`.
    pub fn complete(&mut self, key: &str, result: T) {
        self.slots
            .insert(key.to_string(), Slot::Completed(result));
    }

    /// Forgets a key whose side effect failed, so a retry runs again.
    pub fn abandon(&mut self, key: &str) {
        if let Some(Slot::InFlight) = self.slots.get(key) {
            self.slots.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
