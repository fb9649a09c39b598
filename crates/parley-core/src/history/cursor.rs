//! History cursor.

use serde::{Deserialize, Serialize};

/// Boundary of what has been loaded from server-held history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryCursor {
    /// Oldest message id rendered so far. `None` until the first page lands.
    pub oldest_seen_id: Option<String>,
    pub has_more: bool,
    /// A page request is outstanding.
    pub loading: bool,
}

impl Default for HistoryCursor {
    fn default() -> Self {
        Self {
            oldest_seen_id: None,
            has_more: true,
            loading: false,
        }
    }
}

impl HistoryCursor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Moves the boundary to an older page.
    ///
    /// Only applies when the page was requested from the current boundary,
    /// so the cursor never moves back toward newer data.
    pub fn advance(&mut self, requested_before: Option<&str>, oldest_id: Option<String>, has_more: bool) -> bool {
        if requested_before != self.oldest_seen_id.as_deref() {
            return false;
        }
        if let Some(id) = oldest_id {
            self.oldest_seen_id = Some(id);
        }
        self.has_more = has_more;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_only_from_current_boundary() {
        let mut cursor = HistoryCursor::default();
        assert!(cursor.advance(None, Some("m100".to_string()), true));
        assert!(cursor.advance(Some("m100"), Some("m95".to_string()), true));

        // A late page requested from an older boundary is ignored.
        assert!(!cursor.advance(Some("m100"), Some("m99".to_string()), true));
        assert_eq!(cursor.oldest_seen_id.as_deref(), Some("m95"));

        cursor.reset();
        assert_eq!(cursor, HistoryCursor::default());
        assert!(cursor.has_more);
    }
}
