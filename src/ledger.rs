use std::collections::HashSet;

/// Records which result items have already been rendered to the user.
///
/// Three producers write through the ledger (the initial snapshot load,
/// poll ticks, and the final start-job response), so an item delivered by
/// more than one source is rendered exactly once. The ledger only gates
/// rendering; it never triggers it.
///
/// Duplicate names within one job collapse to a single render: the first
/// occurrence wins and later ones are suppressed for the page lifetime.
#[derive(Debug, Default)]
pub struct DisplayLedger {
    displayed: HashSet<String>,
}

impl DisplayLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` has already been rendered.
    pub fn has_displayed(&self, name: &str) -> bool {
        self.displayed.contains(name)
    }

    /// Record `name` as rendered. Idempotent.
    pub fn mark_displayed(&mut self, name: &str) {
        if !self.displayed.contains(name) {
            self.displayed.insert(name.to_string());
        }
    }

    /// Number of distinct names rendered so far.
    pub fn len(&self) -> usize {
        self.displayed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displayed.is_empty()
    }

    /// Clear all entries. Only an explicit reset removes names.
    pub fn reset(&mut self) {
        self.displayed.clear();
    }
}
