//! Ordered append/prepend log of transcript entries.

use std::collections::{HashSet, VecDeque};

use super::entry::{EntryDraft, EntryId, EntryPosition, EntryRole, TranscriptEntry};

/// The single ordered log every component writes into.
///
/// Live entries are appended at the tail; history pages are prepended above
/// the head as oldest-first blocks, so history always sorts before anything
/// appended live. Entries carrying a service identifier are rendered at most
/// once per role: a draft whose `(id, role)` is already present is skipped.
/// One service message may carry several parts (reasoning and reply) under
/// the same id.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    entries: VecDeque<TranscriptEntry>,
    seen_ids: HashSet<(String, EntryRole)>,
    next_local_id: u64,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> EntryId {
        self.next_local_id += 1;
        EntryId(self.next_local_id)
    }

    /// Registers the draft's service key; returns false if it was seen before.
    fn claim(&mut self, draft: &EntryDraft) -> bool {
        match &draft.id {
            Some(id) => self.seen_ids.insert((id.clone(), draft.role)),
            None => true,
        }
    }

    fn materialize(&mut self, draft: EntryDraft, position: EntryPosition) -> TranscriptEntry {
        TranscriptEntry {
            local_id: self.allocate(),
            id: draft.id,
            role: draft.role,
            text: draft.text,
            position,
        }
    }

    /// Appends an entry at the live tail.
    ///
    /// Returns `None` when the draft duplicates an already rendered entry.
    pub fn append(&mut self, draft: EntryDraft) -> Option<EntryId> {
        if !self.claim(&draft) {
            return None;
        }
        let entry = self.materialize(draft, EntryPosition::Append);
        let local_id = entry.local_id;
        self.entries.push_back(entry);
        Some(local_id)
    }

    /// Shorthand for appending an entry without a service id.
    pub fn push(&mut self, role: EntryRole, text: impl Into<String>) -> EntryId {
        let entry = self.materialize(EntryDraft::new(role, text), EntryPosition::Append);
        let local_id = entry.local_id;
        self.entries.push_back(entry);
        local_id
    }

    /// Inserts an oldest-first block above the current head.
    ///
    /// After the call the block occupies the first positions in the same
    /// relative order it was given. Duplicates are dropped. Returns the
    /// number of entries actually inserted.
    pub fn prepend_block(&mut self, drafts: Vec<EntryDraft>) -> usize {
        let mut block = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if self.claim(&draft) {
                block.push(self.materialize(draft, EntryPosition::Prepend));
            }
        }

        let inserted = block.len();
        for entry in block.into_iter().rev() {
            self.entries.push_front(entry);
        }
        inserted
    }

    /// Removes an entry by local id.
    pub fn remove(&mut self, local_id: EntryId) -> Option<TranscriptEntry> {
        let index = self.entries.iter().position(|e| e.local_id == local_id)?;
        let removed = self.entries.remove(index)?;
        if let Some(id) = &removed.id {
            self.seen_ids.remove(&(id.clone(), removed.role));
        }
        Some(removed)
    }

    /// Replaces the text of an entry in place. Returns false if it is gone.
    pub fn update_text(&mut self, local_id: EntryId, text: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.local_id == local_id) {
            Some(entry) => {
                entry.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, local_id: EntryId) -> bool {
        self.entries.iter().any(|e| e.local_id == local_id)
    }

    /// Drops every entry and forgets all seen service ids.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen_ids.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.back()
    }

    /// `(role, text)` pairs in render order.
    pub fn snapshot(&self) -> Vec<(EntryRole, String)> {
        self.entries
            .iter()
            .map(|e| (e.role, e.text.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str, text: &str) -> EntryDraft {
        EntryDraft::new(EntryRole::Agent, text).with_id(Some(id.to_string()))
    }

    #[test]
    fn test_prepend_block_keeps_history_above_live_entries() {
        let mut buffer = TranscriptBuffer::new();
        buffer.push(EntryRole::User, "live");

        let inserted = buffer.prepend_block(vec![draft("m1", "oldest"), draft("m2", "older")]);
        assert_eq!(inserted, 2);

        let texts: Vec<String> = buffer.snapshot().into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts, vec!["oldest", "older", "live"]);

        buffer.prepend_block(vec![draft("m0", "ancient")]);
        assert_eq!(buffer.entries().next().unwrap().text, "ancient");
        assert_eq!(
            buffer.entries().next().unwrap().position,
            EntryPosition::Prepend
        );
    }

    #[test]
    fn test_duplicate_service_ids_are_rendered_once() {
        let mut buffer = TranscriptBuffer::new();
        assert!(buffer.append(draft("m5", "hello")).is_some());
        assert!(buffer.append(draft("m5", "hello again")).is_none());
        assert_eq!(buffer.prepend_block(vec![draft("m5", "dup"), draft("m4", "new")]), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_parts_sharing_an_id_render_once_each() {
        let mut buffer = TranscriptBuffer::new();
        let reasoning = EntryDraft::new(EntryRole::DebugReasoning, "thinking").with_id(Some("m1".to_string()));
        let reply = draft("m1", "The answer");

        assert_eq!(buffer.prepend_block(vec![reasoning.clone(), reply.clone()]), 2);
        assert!(buffer.append(reply.clone()).is_none());
        assert!(buffer.append(reasoning).is_none());

        let agent = buffer.entries().find(|e| e.role == EntryRole::Agent).map(|e| e.local_id).unwrap();
        buffer.remove(agent);
        assert!(buffer.append(reply).is_some());
        assert_eq!(
            buffer.snapshot(),
            vec![
                (EntryRole::DebugReasoning, "thinking".to_string()),
                (EntryRole::Agent, "The answer".to_string()),
            ]
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let mut buffer = TranscriptBuffer::new();
        let user = buffer.push(EntryRole::User, "Hi");
        let loading = buffer.push(EntryRole::Loading, "Thinking...");

        assert!(buffer.update_text(loading, "Still working..."));
        assert_eq!(buffer.last().unwrap().text, "Still working...");
        assert!(buffer.remove(loading).is_some());
        assert!(!buffer.update_text(loading, "gone"));
        assert!(!buffer.contains(loading));
        assert!(buffer.contains(user));
        assert!(buffer.remove(loading).is_none());

        buffer.append(draft("m1", "x"));
        buffer.clear();
        assert!(buffer.is_empty());
        // Forgotten ids may be rendered again after a clear.
        assert!(buffer.append(draft("m1", "x")).is_some());
    }
}
