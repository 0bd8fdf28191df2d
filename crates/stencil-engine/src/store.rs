//! Per-pass deduplication store.
//!
//! Three append-only sets (interfaces, implementations, instantiations) keyed
//! by full structural equality. `offer` is an atomic test-and-set: for any
//! number of concurrent offers of equal records exactly one sees
//! [`Offer::Added`].
//!
//! Each set also hands out a monotonic sequence number per record so that
//! read-side snapshots come back in discovery order.

use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use stencil_core::{
    Fingerprinted, TemplateImplementationRecord, TemplateInstantiationRecord,
    TemplateInterfaceRecord, TemplateName,
};
use tracing::trace;

/// Outcome of offering a record to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// First time this record was seen in the pass.
    Added,
    /// A structurally equal record was already present.
    AlreadyPresent,
}

impl Offer {
    pub fn is_added(self) -> bool {
        self == Offer::Added
    }
}

/// An append-only set of records with discovery order.
#[derive(Debug)]
pub struct RecordSet<R: Eq + Hash> {
    entries: DashMap<Arc<R>, u64>,
    sequence: AtomicU64,
}

impl<R: Eq + Hash> Default for RecordSet<R> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }
}

impl<R: Eq + Hash + Fingerprinted> RecordSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless an equal record is present.
    ///
    /// Returns the shared record that is stored, which is the earlier one when
    /// the offer was a duplicate.
    pub fn offer(&self, record: R) -> (Offer, Arc<R>) {
        let record = Arc::new(record);
        // The entry holds the shard lock, so test and insert are one step.
        match self.entries.entry(Arc::clone(&record)) {
            Entry::Occupied(existing) => {
                trace!(fingerprint = %record.fingerprint(), "duplicate record");
                (Offer::AlreadyPresent, Arc::clone(existing.key()))
            }
            Entry::Vacant(slot) => {
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(seq);
                (Offer::Added, record)
            }
        }
    }

    pub fn contains(&self, record: &R) -> bool {
        self.entries.contains_key(record)
    }

    /// Discovery sequence number of a stored record.
    pub fn sequence_of(&self, record: &R) -> Option<u64> {
        self.entries.get(record).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All records in discovery order.
    pub fn snapshot(&self) -> Vec<Arc<R>> {
        self.filtered(|_| true)
    }

    /// Records matching `predicate`, in discovery order.
    pub fn filtered(&self, predicate: impl Fn(&R) -> bool) -> Vec<Arc<R>> {
        let mut entries: Vec<(u64, Arc<R>)> = self
            .entries
            .iter()
            .filter(|entry| predicate(entry.key()))
            .map(|entry| (*entry.value(), Arc::clone(entry.key())))
            .collect();
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, record)| record).collect()
    }
}

/// The dedup store of one discovery pass.
#[derive(Debug, Default)]
pub struct DiscoveryStore {
    pub interfaces: RecordSet<TemplateInterfaceRecord>,
    pub implementations: RecordSet<TemplateImplementationRecord>,
    pub instantiations: RecordSet<TemplateInstantiationRecord>,
}

impl DiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interfaces declared under `name`, any arity.
    pub fn interfaces_named(&self, name: &TemplateName) -> Vec<Arc<TemplateInterfaceRecord>> {
        self.interfaces.filtered(|r| r.name() == name)
    }

    /// Implementations claiming `template`.
    pub fn implementations_of(
        &self,
        template: &TemplateName,
    ) -> Vec<Arc<TemplateImplementationRecord>> {
        self.implementations.filtered(|r| &r.template == template)
    }

    /// Instantiation requests for `template`.
    pub fn instantiations_of(
        &self,
        template: &TemplateName,
    ) -> Vec<Arc<TemplateInstantiationRecord>> {
        self.instantiations.filtered(|r| &r.template == template)
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
            && self.implementations.is_empty()
            && self.instantiations.is_empty()
    }
}
