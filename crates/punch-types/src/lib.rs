//! Foundation types for the punchclock data store.
//!
//! Every value the store persists is a [`Record`]: an immutable value object
//! with a collection-scoped [`RecordId`] and a deterministic mapping to an
//! ordered list of `(key, value)` string pairs. The store and its disk codec
//! only ever see records through that contract.
//!
//! # Key Types
//!
//! - [`RecordId`]: monotonically minted identifier, unique within a collection
//! - [`Record`]: the serialization contract every stored type implements
//! - [`FieldMap`]: parsed key/value pairs with typed, error-reporting accessors
//!
//! # Record Types
//!
//! - [`Employee`], [`Project`]: the people and work being tracked
//! - [`TimeEntry`]: minutes an employee spent on a project on a date
//! - [`User`], [`Role`], [`Session`]: login accounts and their sessions
//! - [`SystemConfiguration`], [`LogLevel`]: process-wide settings

pub mod error;
pub mod fields;
pub mod id;
pub mod record;
pub mod staff;
pub mod system;
pub mod time_entry;
pub mod user;

pub use error::{FieldError, Result};
pub use fields::FieldMap;
pub use id::RecordId;
pub use record::Record;
pub use staff::{Employee, Project};
pub use system::{LogLevel, SystemConfiguration};
pub use time_entry::TimeEntry;
pub use user::{Role, Session, User};
