//! The people and the work being tracked.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fields::FieldMap;
use crate::id::RecordId;
use crate::record::Record;

/// A person whose time is tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: RecordId,
    pub name: String,
}

impl Employee {
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Record for Employee {
    const KEYS: &'static [&'static str] = &["id", "name"];

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.to_string()), ("name", self.name.clone())]
    }

    fn from_fields(fields: &FieldMap) -> Result<Self> {
        Ok(Self {
            id: fields.parse("id")?,
            name: fields.string("name")?,
        })
    }
}

/// Something time can be booked against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
}

impl Project {
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Record for Project {
    const KEYS: &'static [&'static str] = &["id", "name"];

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.to_string()), ("name", self.name.clone())]
    }

    fn from_fields(fields: &FieldMap) -> Result<Self> {
        Ok(Self {
            id: fields.parse("id")?,
            name: fields.string("name")?,
        })
    }
}
