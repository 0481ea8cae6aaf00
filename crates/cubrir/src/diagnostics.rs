//! Capped diagnostic history for data-quality warnings.
//!
//! Extraction and aggregation never abort on bad input; they drop the
//! offending record and note it here. The log is an explicit object passed
//! to whoever needs it rather than process-wide mutable state, and it keeps
//! only the last `capacity` entries.

use std::collections::VecDeque;

/// Default number of diagnostics retained
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 100;

/// Bounded ring buffer of diagnostic messages
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<String>,
    capacity: usize,
    /// Total pushed, including entries already evicted
    total_recorded: u64,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_DIAGNOSTIC_CAPACITY)
    }
}

impl DiagnosticLog {
    /// Create a log with the default capacity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log retaining at most `capacity` entries
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_DIAGNOSTIC_CAPACITY)),
            capacity: capacity.max(1),
            total_recorded: 0,
        }
    }

    /// Record a diagnostic, evicting the oldest entry when full
    pub fn record(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(message.into());
        self.total_recorded += 1;
    }

    /// Entries currently retained, oldest first
    #[must_use]
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of retained entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any diagnostics are retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total diagnostics ever recorded, including evicted ones
    #[must_use]
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    /// Drop all retained entries (the total count is preserved)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
