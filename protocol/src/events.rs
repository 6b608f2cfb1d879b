//! # Event Streams
//!
//! Append-only audit streams. Each stream is identified by an [`EventKey`]
//! (owning account + stream name) and written through an [`EventHandle`] that
//! numbers its events consecutively from zero.
//!
//! Emission never fails and never influences control flow: the
//! [`EventSink`] trait has no error path. The bundled [`EventLog`] keeps
//! records in memory; an embedder that ships them elsewhere implements the
//! trait itself.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::AccountAddress;

/// Identifies one event stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    owner: AccountAddress,
    stream: String,
}

impl EventKey {
    /// Key for the `stream` stream owned by `owner`.
    pub fn new(owner: AccountAddress, stream: impl Into<String>) -> Self {
        Self {
            owner,
            stream: stream.into(),
        }
    }

    /// The account the stream hangs off.
    pub fn owner(&self) -> AccountAddress {
        self.owner
    }

    /// Stream name, e.g. `"sent_payment"` or `"mint/XUS"`.
    pub fn stream(&self) -> &str {
        &self.stream
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.stream)
    }
}

/// One emitted event with its position in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord<E> {
    /// Stream the event belongs to.
    pub key: EventKey,
    /// Zero-based position within the stream.
    pub sequence_number: u64,
    /// The payload.
    pub event: E,
}

/// Destination for emitted events. Infallible by contract.
pub trait EventSink<E> {
    /// Append a record.
    fn append(&mut self, record: EventRecord<E>);
}

/// Writer for a single stream. Owned by the record whose activity it logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHandle {
    key: EventKey,
    counter: u64,
}

impl EventHandle {
    /// A fresh handle that has emitted nothing yet.
    pub fn new(owner: AccountAddress, stream: impl Into<String>) -> Self {
        Self {
            key: EventKey::new(owner, stream),
            counter: 0,
        }
    }

    /// The stream key.
    pub fn key(&self) -> &EventKey {
        &self.key
    }

    /// Number of events emitted so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Emit `event` into `sink` and bump the counter.
    pub fn emit<E, S: EventSink<E> + ?Sized>(&mut self, sink: &mut S, event: E) {
        sink.append(EventRecord {
            key: self.key.clone(),
            sequence_number: self.counter,
            event,
        });
        self.counter += 1;
    }
}

/// In-memory event sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog<E> {
    records: Vec<EventRecord<E>>,
}

impl<E> EventLog<E> {
    /// An empty log.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Every record in emission order.
    pub fn records(&self) -> &[EventRecord<E>] {
        &self.records
    }

    /// Records of one stream, oldest first.
    pub fn stream<'a>(&'a self, key: &'a EventKey) -> impl Iterator<Item = &'a EventRecord<E>> + 'a {
        self.records.iter().filter(move |r| &r.key == key)
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every record after the first `len`. Records of an aborted
    /// transaction were never emitted as far as readers are concerned.
    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> EventSink<E> for EventLog<E> {
    fn append(&mut self, record: EventRecord<E>) {
        tracing::trace!(
            key = %record.key,
            seq = record.sequence_number,
            event = ?record.event,
            "event appended"
        );
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_numbers_events_consecutively() {
        let owner = AccountAddress::from_u64(1);
        let mut log: EventLog<&'static str> = EventLog::new();
        let mut handle = EventHandle::new(owner, "sent_payment");

        handle.emit(&mut log, "a");
        handle.emit(&mut log, "b");

        assert_eq!(handle.counter(), 2);
        let seqs: Vec<u64> = log.stream(handle.key()).map(|r| r.sequence_number).collect();
        assert_eq!(seqs, vec![0, 1]);
    }

    #[test]
    fn streams_are_separated_by_key() {
        let owner = AccountAddress::from_u64(1);
        let mut log: EventLog<u64> = EventLog::new();
        let mut mint = EventHandle::new(owner, "mint/XUS");
        let mut burn = EventHandle::new(owner, "burn/XUS");

        mint.emit(&mut log, 10);
        burn.emit(&mut log, 3);
        mint.emit(&mut log, 5);

        assert_eq!(log.len(), 3);
        let mints: Vec<u64> = log.stream(mint.key()).map(|r| r.event).collect();
        assert_eq!(mints, vec![10, 5]);
        assert_eq!(log.stream(burn.key()).count(), 1);
    }

    #[test]
    fn truncate_discards_tail() {
        let mut log: EventLog<u8> = EventLog::new();
        let mut handle = EventHandle::new(AccountAddress::from_u64(2), "s");
        for i in 0..4 {
            handle.emit(&mut log, i);
        }
        log.truncate(1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].event, 0);
    }

    #[test]
    fn key_display_includes_owner_and_stream() {
        let key = EventKey::new(AccountAddress::from_u64(0xAB), "mint/XUS");
        assert!(key.to_string().ends_with("00ab/mint/XUS"));
    }
}
