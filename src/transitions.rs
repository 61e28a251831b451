//! First-order transition counts between consecutive events
//!
//! Row `i` of the ledger lives in registry slot `i`; together the rows form a
//! sparse adjacency view of the full transition-count matrix.

use crate::registry::{EventId, EventRecord};
use crate::sparse::{SparseRow, Targeted};

/// Number of times `source -> target` was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionCount {
    pub target: EventId,
    pub count: u64,
}

impl TransitionCount {
    fn new(target: EventId) -> Self {
        TransitionCount { target, count: 0 }
    }
}

impl Targeted for TransitionCount {
    fn target(&self) -> EventId {
        self.target
    }
}

/// A source event's outgoing transitions, ascending by target
pub type TransitionRow = SparseRow<TransitionCount>;

/// Count one `source -> target` step on the source's row
///
/// Returns the updated count.
pub fn record_transition(source: &mut EventRecord, target: EventId) -> u64 {
    let entry = source
        .transitions
        .get_or_insert_with(target, TransitionCount::new);
    entry.count += 1;
    entry.count
}

/// Count for `source -> target`, zero if never observed
pub fn transition_count(source: &EventRecord, target: EventId) -> u64 {
    source.transitions.get(target).map_or(0, |t| t.count)
}
