//! First-run defaults.

use punch_types::{LogLevel, Role, SystemConfiguration, User};
use tracing::{debug, info};

use crate::database::Database;
use crate::error::DbResult;
use crate::schema::{SYSTEM_CONFIGURATION, USERS};

/// Name of the administrator account created on first run.
pub const ADMINISTRATOR: &str = "administrator";

/// Add a default system configuration and an administrator account, but only
/// to a database with no records at all. Returns whether anything was added.
///
/// The administrator has no password; the hash and salt stay empty until one
/// is set.
pub fn seed_defaults(db: &Database) -> DbResult<bool> {
    if !db.is_empty() {
        debug!(records = db.total_records(), "database not empty; skipping defaults");
        return Ok(false);
    }

    db.data_access::<SystemConfiguration>(SYSTEM_CONFIGURATION)?
        .act_on(|c| {
            c.add(SystemConfiguration {
                id: c.next_index()?,
                log_level: LogLevel::default(),
            })?;
            Ok(())
        })?;

    db.data_access::<User>(USERS)?.act_on(|c| {
        c.add(User {
            id: c.next_index()?,
            name: ADMINISTRATOR.to_string(),
            hash: String::new(),
            salt: String::new(),
            employee: None,
            role: Role::Admin,
        })?;
        Ok(())
    })?;

    info!("seeded default configuration and administrator");
    Ok(true)
}
