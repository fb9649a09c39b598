//! Viewport measurements and anchoring.

use serde::{Deserialize, Serialize};

/// A snapshot of the scrollable transcript view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Total height of the content.
    pub extent: f64,
    /// Height of the visible region.
    pub viewport: f64,
}

impl ScrollMetrics {
    pub fn new(offset: f64, extent: f64, viewport: f64) -> Self {
        Self {
            offset,
            extent,
            viewport,
        }
    }

    pub fn near_top(&self, threshold: f64) -> bool {
        self.offset <= threshold
    }
}

/// Keeps the visible content in place while content is inserted above it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    offset_before: f64,
    extent_before: f64,
}

impl ScrollAnchor {
    /// Records the view right before the mutation.
    pub fn capture(metrics: &ScrollMetrics) -> Self {
        Self {
            offset_before: metrics.offset,
            extent_before: metrics.extent,
        }
    }

    /// Offset to scroll to once the mutated content measures `extent_after`.
    pub fn restore(&self, extent_after: f64) -> f64 {
        (self.offset_before + (extent_after - self.extent_before)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_adds_inserted_extent() {
        let anchor = ScrollAnchor::capture(&ScrollMetrics::new(12.0, 800.0, 400.0));
        assert_eq!(anchor.restore(1_150.0), 362.0);
        assert_eq!(anchor.restore(800.0), 12.0);
    }

    #[test]
    fn test_near_top() {
        let metrics = ScrollMetrics::new(40.0, 2_000.0, 500.0);
        assert!(metrics.near_top(50.0));
        assert!(!ScrollMetrics::new(51.0, 2_000.0, 500.0).near_top(50.0));
    }
}
