//! Embedded record store for punchclock.
//!
//! A [`Database`] owns a fixed set of named collections, established when it
//! is opened. Everything else in the application touches data only through a
//! [`RecordAccess`] handle obtained from [`Database::data_access`]:
//!
//! - [`RecordAccess::read`] runs a projection over a snapshot. It never
//!   blocks writers and never touches disk.
//! - [`RecordAccess::act_on`] runs a mutation with exclusive access to the
//!   collection, then queues one file write or delete per changed record on
//!   the database's background writer.
//!
//! Memory is authoritative. Disk is a write-behind shadow: a failed file
//! write is logged by the writer thread and never surfaces to the caller
//! that made the change. [`Database::stop`] drains every queued write.
//!
//! ```no_run
//! use punch_db::{schema, Database, DatabaseConfig};
//! use punch_types::Employee;
//!
//! # fn main() -> punch_db::DbResult<()> {
//! let db = Database::open_time_tracking(DatabaseConfig::on_disk("data/db"))?;
//! let employees = db.data_access::<Employee>(schema::EMPLOYEES)?;
//!
//! let id = employees.act_on(|c| {
//!     let id = c.next_index()?;
//!     c.add(Employee::new(id, "Alice"))?;
//!     Ok(id)
//! })?;
//! let alice = employees.read(|snapshot| snapshot.get(id).cloned());
//! assert_eq!(alice.map(|e| e.name), Some("Alice".to_string()));
//!
//! db.stop();
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod config;
pub mod database;
pub mod error;
pub mod schema;
pub mod seed;

pub use access::RecordAccess;
pub use config::DatabaseConfig;
pub use database::{Database, DatabaseBuilder};
pub use error::{DbError, DbResult};
pub use punch_persist::SyncMode;
pub use punch_store::{IndexedCollection, Snapshot};
