//! Typed access to one collection.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use punch_persist::queue::Action;
use punch_persist::{DiskCodec, PersistError, WriteQueue};
use punch_store::{Change, ChangeKind, IndexedCollection, Snapshot};
use punch_types::Record;
use tracing::{debug, warn};

use crate::error::DbResult;

/// One registered collection together with the lock that serializes its
/// mutations. Shared by the database and every handle to the collection.
pub(crate) struct CollectionSlot<R: Record> {
    pub(crate) name: String,
    pub(crate) records: IndexedCollection<R>,
    mutation: Mutex<()>,
}

impl<R: Record> CollectionSlot<R> {
    pub(crate) fn new(name: impl Into<String>, records: IndexedCollection<R>) -> Self {
        Self {
            name: name.into(),
            records,
            mutation: Mutex::new(()),
        }
    }

    /// Copy of the committed state. Waits for any in-flight mutation.
    pub(crate) fn committed_copy(&self) -> Self {
        let _serialized = self.mutation.lock();
        Self::new(self.name.clone(), self.records.deep_copy())
    }
}

/// Where committed changes go when the database is disk-backed.
#[derive(Clone)]
pub(crate) struct Persistence {
    pub(crate) queue: Arc<WriteQueue>,
    pub(crate) codec: Arc<DiskCodec>,
}

/// Handle for reading and mutating one collection.
///
/// Cheap to clone; every clone refers to the same collection.
pub struct RecordAccess<R: Record> {
    slot: Arc<CollectionSlot<R>>,
    persistence: Option<Persistence>,
}

impl<R: Record> Clone for RecordAccess<R> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            persistence: self.persistence.clone(),
        }
    }
}

impl<R: Record> RecordAccess<R> {
    pub(crate) fn new(slot: Arc<CollectionSlot<R>>, persistence: Option<Persistence>) -> Self {
        Self { slot, persistence }
    }

    /// Name of the collection this handle reads and writes.
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn len(&self) -> usize {
        self.slot.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.records.is_empty()
    }

    /// Run `projection` over a snapshot of the collection.
    ///
    /// Reads do not wait for mutations and never see one half-applied record,
    /// but a read racing an [`act_on`](Self::act_on) may observe some of its
    /// records changed and others not yet.
    pub fn read<T>(&self, projection: impl FnOnce(&Snapshot<R>) -> T) -> T {
        projection(&self.slot.records.snapshot())
    }

    /// Run `mutation` with exclusive access to the collection, then queue the
    /// disk writes for every record it changed.
    ///
    /// Mutations on the same collection run one at a time. If `mutation`
    /// returns an error or panics, every record it touched is put back and
    /// nothing is written. Identifiers minted with
    /// [`IndexedCollection::next_index`] are not handed out again either way.
    ///
    /// Fails with [`PersistError::QueueStopping`] once the database has been
    /// stopped; memory is left untouched in that case.
    ///
    /// The collection lock is not reentrant. Inside `mutation`, do not call
    /// `act_on` on this collection again and do not call
    /// [`Database::copy`](crate::Database::copy): both wait for this very
    /// mutation to finish and deadlock. Other collections are fine.
    pub fn act_on<T>(
        &self,
        mutation: impl FnOnce(&IndexedCollection<R>) -> DbResult<T>,
    ) -> DbResult<T> {
        let _serialized = self.slot.mutation.lock();
        if let Some(persistence) = &self.persistence {
            if persistence.queue.is_stopping() {
                return Err(PersistError::QueueStopping.into());
            }
        }

        let pending = PendingMutation {
            slot: &self.slot,
            committed: false,
        };
        let value = mutation(&self.slot.records)?;
        let changes = pending.commit();

        if let Some(persistence) = &self.persistence {
            let actions = self.write_actions(&changes, persistence);
            let writes = actions.len();
            if let Err(e) = persistence.queue.enqueue_batch(actions) {
                self.slot.records.revert(changes);
                return Err(e.into());
            }
            if writes > 0 {
                debug!(collection = %self.slot.name, writes, "mutation queued for disk");
            }
        }
        Ok(value)
    }

    /// One queued action per record whose persisted copy is now stale. The
    /// record text is rendered here, on the caller's thread.
    fn write_actions(&self, changes: &[Change<R>], persistence: &Persistence) -> Vec<Action> {
        changes
            .iter()
            .filter_map(|change| {
                let id = change.id;
                let collection = self.slot.name.clone();
                let codec = Arc::clone(&persistence.codec);
                match change.kind() {
                    ChangeKind::Write(record) => {
                        let text = DiskCodec::serialize(record);
                        let action: Action =
                            Box::new(move || codec.write_text(&collection, id, &text));
                        Some(action)
                    }
                    ChangeKind::Delete => {
                        let action: Action = Box::new(move || -> punch_persist::Result<()> {
                            if !codec.delete(id, &collection)? {
                                debug!(%collection, %id, "record file already absent");
                            }
                            Ok(())
                        });
                        Some(action)
                    }
                    ChangeKind::Unchanged => None,
                }
            })
            .collect()
    }
}

impl<R: Record> fmt::Debug for RecordAccess<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordAccess")
            .field("collection", &self.slot.name)
            .field("records", &self.slot.records.len())
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}

/// Rolls the collection back unless the mutation is committed.
struct PendingMutation<'a, R: Record> {
    slot: &'a CollectionSlot<R>,
    committed: bool,
}

impl<R: Record> PendingMutation<'_, R> {
    fn commit(mut self) -> Vec<Change<R>> {
        self.committed = true;
        self.slot.records.drain_changes()
    }
}

impl<R: Record> Drop for PendingMutation<'_, R> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let restored = self.slot.records.rollback();
        if restored > 0 {
            warn!(collection = %self.slot.name, restored, "mutation abandoned; records restored");
        }
    }
}
