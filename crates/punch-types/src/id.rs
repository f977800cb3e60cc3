use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Collection-scoped record identifier.
///
/// Identifiers are minted from a collection's counter and are never reused,
/// even after the record holding one is deleted. They double as the on-disk
/// file name (`<id>.db`).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw identifier value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw integer value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RecordId> for u64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let id = RecordId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<RecordId>().unwrap(), id);
    }

    #[test]
    fn negative_and_garbage_do_not_parse() {
        assert!("-1".parse::<RecordId>().is_err());
        assert!("abc".parse::<RecordId>().is_err());
        assert!("".parse::<RecordId>().is_err());
    }

    #[test]
    fn ordering_follows_value() {
        assert!(RecordId::new(2) < RecordId::new(10));
    }

    #[test]
    fn serde_is_transparent() {
        let json = serde_json::to_string(&RecordId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
