use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use punch_types::{Record, RecordId};
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::ledger::{Change, ChangeLedger};
use crate::snapshot::Snapshot;

/// Thread-safe set of records keyed by identifier.
///
/// Backed by a sharded [`DashMap`]: single-element operations only lock the
/// shard holding the target id, and snapshots clone element by element, so
/// readers never wait for a whole-collection lock.
///
/// Every mutation is noted in a change ledger while the target shard is
/// still locked, which keeps the ledger's view of one record in the same
/// order as the map's. The ledger grows until [`drain_changes`] is called.
///
/// [`drain_changes`]: IndexedCollection::drain_changes
/// Counter value once every identifier up to `u64::MAX` has been used. Ids
/// start at 1, so zero is never a real "next" value.
const EXHAUSTED: u64 = 0;

pub struct IndexedCollection<R: Record> {
    records: DashMap<RecordId, R>,
    next_index: AtomicU64,
    ledger: Mutex<ChangeLedger<R>>,
}

impl<R: Record> IndexedCollection<R> {
    /// Create an empty collection whose first minted id is `1`.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_index: AtomicU64::new(1),
            ledger: Mutex::new(ChangeLedger::new()),
        }
    }

    /// Build a collection from existing records without noting any changes.
    ///
    /// The id counter is seeded past both the record count and the largest
    /// identifier present, so ids freed by earlier deletions stay retired.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> StoreResult<Self> {
        let collection = Self::new();
        for record in records {
            collection.insert_untracked(record)?;
        }
        collection.raise_counter((collection.len() as u64).checked_add(1));
        Ok(collection)
    }

    // -----------------------------------------------------------------------
    // Identifiers
    // -----------------------------------------------------------------------

    /// Mint a fresh identifier. Every call returns a different value; once
    /// `u64::MAX` has been handed out or stored, minting fails with
    /// [`StoreError::IdentifiersExhausted`] instead of wrapping.
    pub fn next_index(&self) -> StoreResult<RecordId> {
        self.next_index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| match next {
                EXHAUSTED => None,
                u64::MAX => Some(EXHAUSTED),
                next => Some(next + 1),
            })
            .map(RecordId::new)
            .map_err(|_| StoreError::IdentifiersExhausted)
    }

    /// The identifier the next call to [`next_index`](Self::next_index) would
    /// return, without consuming it. `None` once identifiers are exhausted.
    pub fn peek_next_index(&self) -> Option<RecordId> {
        match self.next_index.load(Ordering::Acquire) {
            EXHAUSTED => None,
            next => Some(RecordId::new(next)),
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Insert a record. Fails if its identifier is already present.
    pub fn add(&self, record: R) -> StoreResult<()> {
        let id = record.id();
        match self.records.entry(id) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateRecord { id }),
            Entry::Vacant(slot) => {
                let mut ledger = self.ledger.lock();
                ledger.note(id, None, Some(record.clone()));
                slot.insert(record);
            }
        }
        self.bump_counter_past(id);
        trace!(%id, "record added");
        Ok(())
    }

    /// Remove a record, matched by identifier. Returns the stored value.
    pub fn remove(&self, record: &R) -> StoreResult<R> {
        self.remove_id(record.id())
    }

    /// Remove the record with this identifier. Returns the stored value.
    pub fn remove_id(&self, id: RecordId) -> StoreResult<R> {
        match self.records.entry(id) {
            Entry::Vacant(_) => Err(StoreError::MissingRecord { id }),
            Entry::Occupied(slot) => {
                let mut ledger = self.ledger.lock();
                let old = slot.remove();
                ledger.note(id, Some(old.clone()), None);
                trace!(%id, "record removed");
                Ok(old)
            }
        }
    }

    /// Replace the stored record that has the same identifier. Returns the
    /// previous value.
    pub fn update(&self, record: R) -> StoreResult<R> {
        let id = record.id();
        match self.records.entry(id) {
            Entry::Vacant(_) => Err(StoreError::MissingRecord { id }),
            Entry::Occupied(mut slot) => {
                let mut ledger = self.ledger.lock();
                let old = slot.insert(record.clone());
                ledger.note(id, Some(old.clone()), Some(record));
                trace!(%id, "record updated");
                Ok(old)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Copy of the record with this identifier.
    pub fn get(&self, id: RecordId) -> Option<R> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Current number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Owned copy of the current membership, ordered by identifier.
    pub fn snapshot(&self) -> Snapshot<R> {
        Snapshot::from_unsorted(
            self.records
                .iter()
                .map(|entry| entry.value().clone())
                .collect(),
        )
    }

    /// Iterate a snapshot of the current membership.
    pub fn iter(&self) -> std::vec::IntoIter<R> {
        self.snapshot().into_iter()
    }

    /// First record matching `predicate`, in identifier order.
    pub fn find(&self, mut predicate: impl FnMut(&R) -> bool) -> Option<R> {
        self.iter().find(|record| predicate(record))
    }

    // -----------------------------------------------------------------------
    // Change ledger
    // -----------------------------------------------------------------------

    /// Number of records touched since the ledger was last drained.
    pub fn pending_changes(&self) -> usize {
        self.ledger.lock().len()
    }

    /// Take every change noted so far, leaving the ledger empty.
    pub fn drain_changes(&self) -> Vec<Change<R>> {
        self.ledger.lock().drain()
    }

    /// Put each changed record back to its `before` value. Reverting is not
    /// itself noted in the ledger.
    pub fn revert(&self, changes: Vec<Change<R>>) {
        for change in changes.into_iter().rev() {
            match change.before {
                Some(before) => {
                    self.records.insert(change.id, before);
                }
                None => {
                    self.records.remove(&change.id);
                }
            }
        }
    }

    /// Drain the ledger and undo everything in it. Returns how many records
    /// were restored.
    pub fn rollback(&self) -> usize {
        let changes = self.drain_changes();
        let restored = changes.len();
        self.revert(changes);
        if restored > 0 {
            trace!(restored, "collection rolled back");
        }
        restored
    }

    // -----------------------------------------------------------------------
    // Copying
    // -----------------------------------------------------------------------

    /// Independent copy of the current records and id counter, with an empty
    /// ledger.
    pub fn deep_copy(&self) -> Self {
        let copy = Self::new();
        for entry in self.records.iter() {
            copy.records.insert(*entry.key(), entry.value().clone());
        }
        copy.next_index
            .store(self.next_index.load(Ordering::Acquire), Ordering::Release);
        copy
    }

    fn insert_untracked(&self, record: R) -> StoreResult<()> {
        let id = record.id();
        match self.records.entry(id) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateRecord { id }),
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        self.bump_counter_past(id);
        Ok(())
    }

    fn bump_counter_past(&self, id: RecordId) {
        self.raise_counter(id.value().checked_add(1));
    }

    /// Move the counter up to `floor`; `None` means past `u64::MAX`. The
    /// counter never moves down and never leaves the exhausted state.
    fn raise_counter(&self, floor: Option<u64>) {
        // `Err` just means the counter was already high enough.
        let _ = self
            .next_index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                match (next, floor) {
                    (EXHAUSTED, _) => None,
                    (_, None) => Some(EXHAUSTED),
                    (next, Some(floor)) if floor > next => Some(floor),
                    _ => None,
                }
            });
    }
}

impl<R: Record> Default for IndexedCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> fmt::Debug for IndexedCollection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedCollection")
            .field("record_count", &self.len())
            .field("next_index", &self.peek_next_index())
            .field("pending_changes", &self.pending_changes())
            .finish()
    }
}
