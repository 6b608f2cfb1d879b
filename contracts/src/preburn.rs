//! Preburn queues: value a designated dealer has handed over for
//! destruction, waiting for the holder of the burn capability to either
//! burn or return it.
//!
//! Entries are matched by exact value, oldest first. There is no "closest"
//! match and no partial burn.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use meridian_protocol::config::MAX_PREBURN_QUEUE_SIZE;

/// One outstanding preburn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreburnEntry {
    /// Value in base units. Never zero.
    pub value: u64,
    /// Ledger time at which the entry was queued.
    pub queued_at_micros: u64,
}

/// FIFO of preburn entries for one (dealer, currency) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreburnQueue {
    entries: VecDeque<PreburnEntry>,
}

impl PreburnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_PREBURN_QUEUE_SIZE
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &PreburnEntry> {
        self.entries.iter()
    }

    /// Sum of all queued values.
    pub fn total_value(&self) -> u128 {
        self.entries.iter().map(|e| e.value as u128).sum()
    }

    /// Appends to the tail. Capacity and non-zero value are checked by the
    /// caller, which knows the dealer and currency for its error.
    pub(crate) fn push(&mut self, entry: PreburnEntry) {
        debug_assert!(entry.value > 0 && !self.is_full());
        self.entries.push_back(entry);
    }

    /// Index of the oldest entry of exactly `value`.
    pub fn position_of(&self, value: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.value == value)
    }

    /// Removes the oldest entry of exactly `value`, if any.
    pub(crate) fn take(&mut self, value: u64) -> Option<PreburnEntry> {
        let index = self.position_of(value)?;
        self.entries.remove(index)
    }
}
