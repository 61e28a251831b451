//! Event registry: call site -> dense event id
//!
//! Open-addressed table with linear probing. Slots are claimed once and never
//! freed, so there are no tombstones: a probe stops at the first empty slot
//! or the first slot holding the same call site, and fails only after visiting
//! every slot.

use std::fmt;

use crate::call_site::{CallSite, FileId};
use crate::error::{Result, TraceError};
use crate::reservoir::ReservoirRow;
use crate::transitions::TransitionRow;

/// Default registry capacity
pub const NEVENTS: usize = 1024;

/// Dense per-thread event identifier in `[0, capacity)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(usize);

impl EventId {
    pub fn new(index: usize) -> Self {
        EventId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything known about one registry slot
#[derive(Debug, Clone, Default)]
pub struct EventRecord {
    pub(crate) site: Option<CallSite>,
    pub(crate) count: u64,
    pub(crate) transitions: TransitionRow,
    pub(crate) latencies: ReservoirRow,
}

impl EventRecord {
    /// A slot is occupied once a call site has claimed it
    pub fn is_occupied(&self) -> bool {
        self.site.is_some()
    }

    pub fn site(&self) -> Option<CallSite> {
        self.site
    }

    pub fn file(&self) -> Option<FileId> {
        self.site.map(|s| s.file)
    }

    pub fn line(&self) -> Option<u32> {
        self.site.map(|s| s.line)
    }

    pub fn occurrence_count(&self) -> u64 {
        self.count
    }

    /// Outgoing transition counts, ascending by target
    pub fn transitions(&self) -> &TransitionRow {
        &self.transitions
    }

    /// Outgoing latency reservoirs, ascending by target
    pub fn latencies(&self) -> &ReservoirRow {
        &self.latencies
    }
}

/// Fixed-size call-site table
#[derive(Debug, Clone)]
pub struct EventRegistry {
    records: Box<[EventRecord]>,
}

impl EventRegistry {
    /// Create an empty registry with `capacity` slots
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TraceError::InvalidCapacity(capacity));
        }
        let records = (0..capacity).map(|_| EventRecord::default()).collect();
        Ok(EventRegistry { records })
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Resolve a call site, claiming a slot on first sight
    ///
    /// Returns `TraceError::Overflow` when every slot is held by another site.
    pub fn resolve(&mut self, site: CallSite) -> Result<EventId> {
        let capacity = self.records.len();
        let start = (site.hash() % capacity as u64) as usize;

        for offset in 0..capacity {
            let index = (start + offset) % capacity;
            let slot = &mut self.records[index];
            match slot.site {
                None => {
                    slot.site = Some(site);
                    return Ok(EventId(index));
                }
                Some(existing) if existing == site => return Ok(EventId(index)),
                Some(_) => {}
            }
        }

        Err(TraceError::Overflow {
            file: site.file.as_str().to_string(),
            line: site.line,
        })
    }

    /// Look up a call site without claiming a slot
    pub fn find(&self, site: CallSite) -> Option<EventId> {
        let capacity = self.records.len();
        let start = (site.hash() % capacity as u64) as usize;

        for offset in 0..capacity {
            let index = (start + offset) % capacity;
            match self.records[index].site {
                None => return None,
                Some(existing) if existing == site => return Some(EventId(index)),
                Some(_) => {}
            }
        }
        None
    }

    pub fn get(&self, id: EventId) -> Option<&EventRecord> {
        self.records.get(id.0)
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut EventRecord> {
        self.records.get_mut(id.0)
    }

    /// All slots, indexed by event id
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Occupied slots with their ids
    pub fn occupied(&self) -> impl Iterator<Item = (EventId, &EventRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_occupied())
            .map(|(i, r)| (EventId(i), r))
    }

    pub fn occupied_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_occupied()).count()
    }

    /// Wipe every slot back to empty
    pub fn clear(&mut self) {
        for record in self.records.iter_mut() {
            *record = EventRecord::default();
        }
    }
}
