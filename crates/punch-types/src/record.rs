use std::fmt::Debug;

use crate::error::Result;
use crate::fields::FieldMap;
use crate::id::RecordId;

/// The contract every stored type implements.
///
/// A record is an immutable value: "updating" one means replacing it with a
/// new value carrying the same [`RecordId`]. Implementations must satisfy:
///
/// - `id()` is stable for the lifetime of the value.
/// - `to_fields()` yields exactly the keys of [`Record::KEYS`], in that order.
/// - `from_fields(&to_fields().into())` reproduces the value exactly.
pub trait Record: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Keys in the order they are written to disk.
    const KEYS: &'static [&'static str];

    /// The identifier this record is stored under.
    fn id(&self) -> RecordId;

    /// Render the record as ordered `(key, value)` pairs.
    fn to_fields(&self) -> Vec<(&'static str, String)>;

    /// Rebuild a record from parsed fields.
    fn from_fields(fields: &FieldMap) -> Result<Self>;
}
