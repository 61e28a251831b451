//! Sparse per-event rows keyed by target event id
//!
//! Each registry slot owns one row of transition counts and one row of
//! latency reservoirs. A dense `NEVENTS x NEVENTS` matrix would be almost
//! entirely zero, so only observed targets get an entry. Entries stay sorted
//! ascending by target id and are never removed.

use crate::registry::EventId;

/// An entry that belongs to exactly one target event
pub trait Targeted {
    fn target(&self) -> EventId;
}

/// Ascending-by-target list of entries with no duplicate targets
#[derive(Debug, Clone)]
pub struct SparseRow<T> {
    entries: Vec<T>,
}

impl<T> Default for SparseRow<T> {
    fn default() -> Self {
        SparseRow {
            entries: Vec::new(),
        }
    }
}

impl<T: Targeted> SparseRow<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `target`, if one has been created
    pub fn get(&self, target: EventId) -> Option<&T> {
        self.position(target).ok().map(|i| &self.entries[i])
    }

    /// Entry for `target`, inserting `make(target)` at its sorted position
    /// if absent
    pub fn get_or_insert_with<F>(&mut self, target: EventId, make: F) -> &mut T
    where
        F: FnOnce(EventId) -> T,
    {
        let index = match self.position(target) {
            Ok(index) => index,
            Err(index) => {
                self.entries.insert(index, make(target));
                index
            }
        };
        &mut self.entries[index]
    }

    /// Entries in ascending target order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, target: EventId) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&target, |entry| entry.target())
    }
}

impl<'a, T> IntoIterator for &'a SparseRow<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
