//! In-memory record collections for the punchclock data store.
//!
//! An [`IndexedCollection`] is a thread-safe, unordered set of records of one
//! type, keyed by [`RecordId`](punch_types::RecordId). It mints new
//! identifiers from an atomic counter and keeps a ledger of the records
//! touched since the ledger was last drained, so that only changed records
//! need to be written back to disk.
//!
//! # Design Rules
//!
//! 1. Single-element operations (`add`, `remove`, `update`) are safe from any
//!    number of threads without caller-side locking.
//! 2. Identifiers are never reused: the counter only moves forward, and
//!    inserting a record with an explicit id pushes the counter past it.
//! 3. Iteration works on a [`Snapshot`]: a sorted, owned copy of the
//!    membership at the time it was taken. Readers never block writers.
//! 4. Adding an id that already exists, or removing/updating one that does
//!    not, is an error. The collection is strict, not defensive.
//! 5. Compound sequences ("mint an id, then add") are not atomic here. That
//!    is the job of the layer that serializes mutations.

pub mod collection;
pub mod error;
pub mod ledger;
pub mod snapshot;

pub use collection::IndexedCollection;
pub use error::{StoreError, StoreResult};
pub use ledger::{Change, ChangeKind};
pub use snapshot::Snapshot;
