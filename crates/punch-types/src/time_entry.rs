use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fields::FieldMap;
use crate::id::RecordId;
use crate::record::Record;

/// Date format used on disk.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Minutes an employee spent on a project on one day.
///
/// Business rules about how much time may be booked per day live with the
/// callers; the store only guarantees the entry round-trips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: RecordId,
    pub employee: RecordId,
    pub project: RecordId,
    pub minutes: u32,
    pub date: NaiveDate,
    pub details: String,
}

impl Record for TimeEntry {
    const KEYS: &'static [&'static str] =
        &["id", "employee", "project", "minutes", "date", "details"];

    fn id(&self) -> RecordId {
        self.id
    }

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.to_string()),
            ("employee", self.employee.to_string()),
            ("project", self.project.to_string()),
            ("minutes", self.minutes.to_string()),
            ("date", self.date.format(DATE_FORMAT).to_string()),
            ("details", self.details.clone()),
        ]
    }

    fn from_fields(fields: &FieldMap) -> Result<Self> {
        Ok(Self {
            id: fields.parse("id")?,
            employee: fields.parse("employee")?,
            project: fields.parse("project")?,
            minutes: fields.parse("minutes")?,
            date: fields.parse_with("date", |s| NaiveDate::parse_from_str(s, DATE_FORMAT))?,
            details: fields.string("details")?,
        })
    }
}
