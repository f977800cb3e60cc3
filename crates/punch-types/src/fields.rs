use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{FieldError, Result};

/// Parsed key/value pairs of one stored record.
///
/// Accessors report the offending key on failure so that callers can name it
/// when a persisted file turns out to be unreadable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: BTreeMap<String, String>,
}

impl FieldMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair, returning the previous value for the key if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    /// Raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Raw value for `key`, failing with [`FieldError::Missing`] if absent.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| FieldError::Missing {
            key: key.to_string(),
        })
    }

    /// Owned string value for `key`.
    pub fn string(&self, key: &str) -> Result<String> {
        self.require(key).map(str::to_string)
    }

    /// Parse the value for `key` with [`FromStr`].
    pub fn parse<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(key)?;
        raw.parse::<T>().map_err(|e| malformed(key, raw, e))
    }

    /// Parse an optional value: the key must be present, an empty value
    /// means `None`.
    pub fn parse_optional<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(key)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<T>().map(Some).map_err(|e| malformed(key, raw, e))
    }

    /// Parse the value for `key` with a custom conversion.
    pub fn parse_with<T, E, F>(&self, key: &str, convert: F) -> Result<T>
    where
        E: Display,
        F: FnOnce(&str) -> std::result::Result<T, E>,
    {
        let raw = self.require(key)?;
        convert(raw).map_err(|e| malformed(key, raw, e))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn malformed(key: &str, value: &str, reason: impl Display) -> FieldError {
    FieldError::Malformed {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<Vec<(&'static str, String)>> for FieldMap {
    fn from(pairs: Vec<(&'static str, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FieldMap {
        [("id", "3"), ("name", "Alice"), ("employee", "")]
            .into_iter()
            .collect()
    }

    #[test]
    fn require_reports_missing_key() {
        let err = sample().require("salt").unwrap_err();
        assert_eq!(
            err,
            FieldError::Missing {
                key: "salt".into()
            }
        );
        assert_eq!(err.to_string(), "missing required key `salt`");
    }

    #[test]
    fn parse_reports_malformed_value() {
        let err = sample().parse::<u32>("name").unwrap_err();
        match err {
            FieldError::Malformed { key, value, .. } => {
                assert_eq!(key, "name");
                assert_eq!(value, "Alice");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_optional_treats_empty_as_none() {
        let map = sample();
        assert_eq!(map.parse_optional::<u64>("employee").unwrap(), None);
        assert_eq!(map.parse_optional::<u64>("id").unwrap(), Some(3));
        assert!(map.parse_optional::<u64>("missing").is_err());
    }

    #[test]
    fn parse_with_custom_conversion() {
        let map = sample();
        let upper = map
            .parse_with("name", |s| Ok::<_, String>(s.to_uppercase()))
            .unwrap();
        assert_eq!(upper, "ALICE");

        let err = map
            .parse_with("name", |_| Err::<(), _>("nope"))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn insert_replaces_previous() {
        let mut map = FieldMap::new();
        assert!(map.insert("k", "a").is_none());
        assert_eq!(map.insert("k", "b"), Some("a".into()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k"), Some("b"));
    }
}
