//! Write-behind persistence for the punchclock data store.
//!
//! In-memory collections are the source of truth. This crate shadows them on
//! disk without ever making a caller wait for I/O:
//!
//! - [`WriteQueue`] runs file writes and deletes on one dedicated worker
//!   thread, strictly in the order they were enqueued, and drains everything
//!   still queued before it stops.
//! - [`DiskCodec`] owns the directory layout and the record file format.
//!
//! # On-disk layout
//!
//! ```text
//! <root>/
//!   employees/
//!     1.db        id=1|name=Alice
//!     2.db        id=2|name=Bob
//!   time_entries/
//!     1.db        id=1|employee=1|project=1|minutes=60|date=2024-03-01|details=
//! ```
//!
//! One file per record, one subdirectory per collection, no index or
//! manifest: the file is the record.

pub mod codec;
pub mod error;
pub mod format;
pub mod queue;

pub use codec::{DiskCodec, SyncMode, RECORD_EXTENSION};
pub use error::{PersistError, Result};
pub use queue::WriteQueue;
