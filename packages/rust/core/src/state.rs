//! Run-wide progress counters.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Progress accounting for one run. Observability only; no control flow
/// depends on these values.
#[derive(Debug)]
pub struct PipelineState {
    total_queries: usize,
    processed: AtomicUsize,
}

impl PipelineState {
    pub fn new(total_queries: usize) -> Self {
        Self {
            total_queries,
            processed: AtomicUsize::new(0),
        }
    }

    /// Record one resolved results page (match, no match, or terminal failure).
    ///
    /// Returns `(processed, remaining)` as of this increment.
    pub fn search_resolved(&self) -> (usize, usize) {
        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        (processed, self.total_queries.saturating_sub(processed))
    }

    pub fn total_queries(&self) -> usize {
        self.total_queries
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> usize {
        self.total_queries.saturating_sub(self.processed())
    }
}
