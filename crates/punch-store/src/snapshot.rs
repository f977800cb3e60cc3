use punch_types::{Record, RecordId};

/// An owned, read-only view of a collection's membership.
///
/// Records are ordered by identifier. A snapshot never changes after it is
/// taken, so it can be iterated any number of times.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<R> {
    records: Vec<R>,
}

impl<R: Record> Snapshot<R> {
    pub(crate) fn from_unsorted(mut records: Vec<R>) -> Self {
        records.sort_by_key(R::id);
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by identifier.
    pub fn get(&self, id: RecordId) -> Option<&R> {
        self.records
            .binary_search_by_key(&id, R::id)
            .ok()
            .map(|index| &self.records[index])
    }

    /// Returns `true` if a record with this identifier is present.
    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate records in identifier order.
    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }

    /// All identifiers, ascending.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(R::id).collect()
    }

    /// The records as a slice.
    pub fn as_slice(&self) -> &[R] {
        &self.records
    }

    /// Consume the snapshot, returning its records.
    pub fn into_vec(self) -> Vec<R> {
        self.records
    }
}

impl<R> IntoIterator for Snapshot<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a Snapshot<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
