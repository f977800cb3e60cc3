use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fields::FieldMap;
use crate::id::RecordId;
use crate::record::Record;

/// What a user is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Internal account used for bootstrapping; never logs in interactively.
    System,
    Admin,
    Approver,
    Regular,
    None,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::System,
        Role::Admin,
        Role::Approver,
        Role::Regular,
        Role::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Admin => "admin",
            Self::Approver => "approver",
            Self::Regular => "regular",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role `{s}`"))
    }
}

/// A login account, optionally tied to an employee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: RecordId,
    pub name: String,
    /// Password hash; empty until a password has been set.
    pub hash: String,
    pub salt: String,
    pub employee: Option<RecordId>,
    pub role: Role,
}

impl Record for User {
    const KEYS: &'static [&'static str] = &["id", "name", "hash", "salt", "employee", "role"];

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.to_string()),
            ("name", self.name.clone()),
            ("hash", self.hash.clone()),
            ("salt", self.salt.clone()),
            (
                "employee",
                self.employee.map(|e| e.to_string()).unwrap_or_default(),
            ),
            ("role", self.role.to_string()),
        ]
    }

    fn from_fields(fields: &FieldMap) -> Result<Self> {
        Ok(Self {
            id: fields.parse("id")?,
            name: fields.string("name")?,
            hash: fields.string("hash")?,
            salt: fields.string("salt")?,
            employee: fields.parse_optional("employee")?,
            role: fields.parse("role")?,
        })
    }
}

/// An authenticated session for a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: RecordId,
    pub token: String,
    pub user: RecordId,
    pub created: DateTime<Utc>,
}

impl Record for Session {
    const KEYS: &'static [&'static str] = &["id", "token", "user", "created"];

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.to_string()),
            ("token", self.token.clone()),
            ("user", self.user.to_string()),
            (
                "created",
                self.created.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ),
        ]
    }

    fn from_fields(fields: &FieldMap) -> Result<Self> {
        Ok(Self {
            id: fields.parse("id")?,
            token: fields.string("token")?,
            user: fields.parse("user")?,
            created: fields.parse_with("created", |s| {
                DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
            })?,
        })
    }
}
