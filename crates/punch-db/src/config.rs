use std::fs;
use std::path::{Path, PathBuf};

use punch_persist::SyncMode;
use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// Default name of the background writer thread.
pub const DEFAULT_WORKER_NAME: &str = "punch-writer";

/// How a [`Database`](crate::Database) is opened.
///
/// ```toml
/// directory = "/var/lib/punchclock/db"
/// sync = "every_write"
/// worker_name = "punch-writer"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Root directory of the record files. `None` keeps everything in memory.
    pub directory: Option<PathBuf>,
    /// Flush strategy for record files.
    pub sync: SyncMode,
    /// Name given to the background writer thread.
    pub worker_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            directory: None,
            sync: SyncMode::default(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Memory-only: nothing is read from or written to disk.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Disk-backed, rooted at `directory`.
    pub fn on_disk(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.directory.is_some()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> DbResult<Self> {
        toml::from_str(text).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> DbResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
