//! Change tracking for write-behind persistence.
//!
//! The ledger remembers, per touched identifier, the value the record had
//! before it was first touched and the value it has now. Draining the ledger
//! yields one [`Change`] per identifier: enough to decide what to write to
//! disk, and enough to put memory back the way it was.

use std::collections::HashMap;

use punch_types::{Record, RecordId};

/// Net effect of all mutations to one record since the ledger was drained.
#[derive(Clone, Debug, PartialEq)]
pub struct Change<R> {
    pub id: RecordId,
    /// Value before the first mutation, `None` if the record did not exist.
    pub before: Option<R>,
    /// Current value, `None` if the record no longer exists.
    pub after: Option<R>,
}

/// What a [`Change`] means for the persisted copy of the record.
#[derive(Debug, PartialEq)]
pub enum ChangeKind<'a, R> {
    /// The record must be (re)written with this value.
    Write(&'a R),
    /// The record's file must be removed.
    Delete,
    /// Nothing to do: the record ended up as it started.
    Unchanged,
}

impl<R: Record> Change<R> {
    pub fn kind(&self) -> ChangeKind<'_, R> {
        match (&self.before, &self.after) {
            (before, Some(after)) if before.as_ref() != Some(after) => ChangeKind::Write(after),
            (Some(_), None) => ChangeKind::Delete,
            _ => ChangeKind::Unchanged,
        }
    }
}

/// Insertion-ordered ledger keyed by record identifier.
#[derive(Debug)]
pub(crate) struct ChangeLedger<R> {
    changes: Vec<Change<R>>,
    positions: HashMap<RecordId, usize>,
}

impl<R> ChangeLedger<R> {
    pub(crate) fn new() -> Self {
        Self {
            changes: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Note a mutation. `before` is only kept for the first touch of `id`.
    pub(crate) fn note(&mut self, id: RecordId, before: Option<R>, after: Option<R>) {
        match self.positions.get(&id) {
            Some(&position) => self.changes[position].after = after,
            None => {
                self.positions.insert(id, self.changes.len());
                self.changes.push(Change { id, before, after });
            }
        }
    }

    pub(crate) fn drain(&mut self) -> Vec<Change<R>> {
        self.positions.clear();
        std::mem::take(&mut self.changes)
    }

    pub(crate) fn len(&self) -> usize {
        self.changes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use punch_types::Employee;

    fn alice(name: &str) -> Employee {
        Employee::new(RecordId::new(1), name)
    }

    #[test]
    fn first_touch_keeps_original_value() {
        let mut ledger = ChangeLedger::new();
        ledger.note(RecordId::new(1), Some(alice("a")), Some(alice("b")));
        ledger.note(RecordId::new(1), Some(alice("b")), Some(alice("c")));

        let changes = ledger.drain();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before, Some(alice("a")));
        assert_eq!(changes[0].after, Some(alice("c")));
        assert_eq!(changes[0].kind(), ChangeKind::Write(&alice("c")));
    }

    #[test]
    fn add_then_remove_is_unchanged() {
        let mut ledger = ChangeLedger::new();
        ledger.note(RecordId::new(1), None, Some(alice("a")));
        ledger.note(RecordId::new(1), Some(alice("a")), None);
        let changes = ledger.drain();
        assert_eq!(changes[0].kind(), ChangeKind::Unchanged);
    }

    #[test]
    fn update_back_to_original_is_unchanged() {
        let mut ledger = ChangeLedger::new();
        ledger.note(RecordId::new(1), Some(alice("a")), Some(alice("b")));
        ledger.note(RecordId::new(1), Some(alice("b")), Some(alice("a")));
        assert_eq!(ledger.drain()[0].kind(), ChangeKind::Unchanged);
    }

    #[test]
    fn removal_of_existing_is_delete() {
        let mut ledger = ChangeLedger::new();
        ledger.note(RecordId::new(1), Some(alice("a")), None);
        assert_eq!(ledger.drain()[0].kind(), ChangeKind::Delete);
    }

    #[test]
    fn drain_preserves_first_touch_order_and_empties() {
        let mut ledger = ChangeLedger::new();
        for id in [5, 2, 9, 2] {
            ledger.note(RecordId::new(id), None, Some(Employee::new(RecordId::new(id), "x")));
        }
        assert_eq!(ledger.len(), 3);
        let ids: Vec<u64> = ledger.drain().iter().map(|c| c.id.value()).collect();
        assert_eq!(ids, vec![5, 2, 9]);
        assert_eq!(ledger.len(), 0);
    }
}
