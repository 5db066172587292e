//! The set of currently scheduled or playing output units.

use std::collections::HashSet;

/// Tracks every playback unit that has been scheduled but not yet
/// finished. A unit leaves the set exactly once, when its playback
/// naturally completes; a hard stop forces the set empty in one call.
#[derive(Debug, Default)]
pub struct SourceSet {
    active: HashSet<u64>,
    next_id: u64,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly scheduled unit, returning its id.
    pub fn register(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.active.insert(id);
        id
    }

    /// Remove a unit that completed naturally. Returns false when the
    /// unit was already gone (e.g. swept out by [`Self::clear`]).
    pub fn finish(&mut self, id: u64) -> bool {
        self.active.remove(&id)
    }

    /// Hard stop: drop every unit immediately.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
