//! Collections of the time-tracking application.

use punch_types::{Employee, Project, Session, SystemConfiguration, TimeEntry, User};

use crate::config::DatabaseConfig;
use crate::database::{Database, DatabaseBuilder};
use crate::error::DbResult;

pub const USERS: &str = "users";
pub const SESSIONS: &str = "sessions";
pub const PROJECTS: &str = "projects";
pub const EMPLOYEES: &str = "employees";
pub const TIME_ENTRIES: &str = "time_entries";
pub const SYSTEM_CONFIGURATION: &str = "system_configuration";

/// Every collection name, in registration order.
pub const ALL: [&str; 6] = [
    USERS,
    SESSIONS,
    PROJECTS,
    EMPLOYEES,
    TIME_ENTRIES,
    SYSTEM_CONFIGURATION,
];

impl DatabaseBuilder {
    /// Register the six time-tracking collections.
    pub fn with_time_tracking(self) -> Self {
        self.collection::<User>(USERS)
            .collection::<Session>(SESSIONS)
            .collection::<Project>(PROJECTS)
            .collection::<Employee>(EMPLOYEES)
            .collection::<TimeEntry>(TIME_ENTRIES)
            .collection::<SystemConfiguration>(SYSTEM_CONFIGURATION)
    }
}

impl Database {
    /// Open a database holding the time-tracking collections.
    pub fn open_time_tracking(config: DatabaseConfig) -> DbResult<Self> {
        Database::builder(config).with_time_tracking().open()
    }
}
