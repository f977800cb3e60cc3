//! The database: a fixed registry of named collections plus the writer that
//! shadows them on disk.

use std::any::{self, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use punch_persist::codec::validate_collection_name;
use punch_persist::{DiskCodec, WriteQueue};
use punch_store::IndexedCollection;
use punch_types::Record;
use tracing::{debug, info, info_span, Span};

use crate::access::{CollectionSlot, Persistence, RecordAccess};
use crate::config::DatabaseConfig;
use crate::error::{DbError, DbResult};

/// A registered collection with its record type erased.
trait ErasedCollection: Send + Sync {
    fn len(&self) -> usize;
    fn record_type(&self) -> &'static str;
    fn detached_copy(&self) -> Arc<dyn ErasedCollection>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<R: Record> ErasedCollection for CollectionSlot<R> {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn record_type(&self) -> &'static str {
        any::type_name::<R>()
    }

    fn detached_copy(&self) -> Arc<dyn ErasedCollection> {
        Arc::new(self.committed_copy())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Embedded record store.
///
/// Opened once with every collection it will ever hold; the set of
/// collections does not change afterwards.
pub struct Database {
    collections: BTreeMap<String, Arc<dyn ErasedCollection>>,
    persistence: Option<Persistence>,
    span: Span,
}

impl Database {
    pub fn builder(config: DatabaseConfig) -> DatabaseBuilder {
        DatabaseBuilder {
            config,
            registrations: Vec::new(),
        }
    }

    /// Typed handle to the collection registered as `name`.
    pub fn data_access<R: Record>(&self, name: &str) -> DbResult<RecordAccess<R>> {
        let erased = self
            .collections
            .get(name)
            .ok_or_else(|| DbError::UnknownCollection {
                name: name.to_string(),
            })?;
        let actual = erased.record_type();
        let slot = Arc::clone(erased)
            .into_any()
            .downcast::<CollectionSlot<R>>()
            .map_err(|_| DbError::CollectionTypeMismatch {
                name: name.to_string(),
                requested: any::type_name::<R>(),
                actual,
            })?;
        Ok(RecordAccess::new(slot, self.persistence.clone()))
    }

    /// Independent in-memory copy of every collection and id counter.
    ///
    /// The copy never writes to disk, and nothing done to it is visible here.
    ///
    /// Each collection is copied between mutations, so this waits for any
    /// [`RecordAccess::act_on`] in progress. Calling it from inside an
    /// `act_on` callback deadlocks on that callback's own collection.
    pub fn copy(&self) -> Database {
        let collections = self
            .collections
            .iter()
            .map(|(name, c)| (name.clone(), c.detached_copy()))
            .collect();
        debug!(parent: &self.span, "database copied");
        Database {
            collections,
            persistence: None,
            span: info_span!(parent: &self.span, "copy"),
        }
    }

    /// `true` if every collection is empty.
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(|c| c.len() == 0)
    }

    /// Refuse further mutations and wait for every queued write to finish.
    ///
    /// Idempotent. A memory-only database has nothing to stop.
    pub fn stop(&self) {
        if let Some(persistence) = &self.persistence {
            persistence.queue.stop();
        }
    }

    /// Wait until every write queued so far has been attempted.
    pub fn flush(&self) -> DbResult<()> {
        if let Some(persistence) = &self.persistence {
            persistence.queue.flush()?;
        }
        Ok(())
    }

    /// Registered collection names, sorted.
    pub fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    pub fn len_of(&self, name: &str) -> DbResult<usize> {
        self.collections
            .get(name)
            .map(|c| c.len())
            .ok_or_else(|| DbError::UnknownCollection {
                name: name.to_string(),
            })
    }

    /// Records across all collections.
    pub fn total_records(&self) -> usize {
        self.collections.values().map(|c| c.len()).sum()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    /// Root directory of the record files, if disk-backed.
    pub fn directory(&self) -> Option<&Path> {
        self.persistence.as_ref().map(|p| p.codec.root())
    }

    /// Writes queued but not yet attempted.
    pub fn pending_writes(&self) -> usize {
        self.persistence
            .as_ref()
            .map_or(0, |p| p.queue.pending())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes: BTreeMap<&str, usize> = self
            .collections
            .iter()
            .map(|(name, c)| (name.as_str(), c.len()))
            .collect();
        f.debug_struct("Database")
            .field("collections", &sizes)
            .field("directory", &self.directory())
            .finish()
    }
}

type Hydrate = Box<dyn FnOnce(&str, Option<&DiskCodec>) -> DbResult<Arc<dyn ErasedCollection>>>;

/// Collects collection registrations, then opens the database.
pub struct DatabaseBuilder {
    config: DatabaseConfig,
    registrations: Vec<(String, Hydrate)>,
}

impl DatabaseBuilder {
    /// Register a collection of `R` under `name`.
    pub fn collection<R: Record>(mut self, name: impl Into<String>) -> Self {
        self.registrations
            .push((name.into(), Box::new(hydrate::<R>)));
        self
    }

    /// Validate the registrations, load every collection from disk when
    /// disk-backed, and start the writer.
    ///
    /// Any unreadable record file halts the open with an error naming it.
    pub fn open(self) -> DbResult<Database> {
        let DatabaseBuilder {
            config,
            registrations,
        } = self;

        let mut seen = BTreeMap::new();
        for (name, _) in &registrations {
            validate_collection_name(name).map_err(DbError::InvalidCollectionName)?;
            if seen.insert(name.as_str(), ()).is_some() {
                return Err(DbError::DuplicateCollection { name: name.clone() });
            }
        }

        let span = match &config.directory {
            Some(dir) => info_span!("punchclock.db", root = %dir.display()),
            None => info_span!("punchclock.db", root = "memory"),
        };

        let codec = match &config.directory {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Some(DiskCodec::new(dir.clone(), config.sync))
            }
            None => None,
        };

        let collections = span.in_scope(|| {
            registrations
                .into_iter()
                .map(|(name, hydrate)| {
                    let collection = hydrate(&name, codec.as_ref())?;
                    debug!(collection = %name, records = collection.len(), "collection ready");
                    Ok((name, collection))
                })
                .collect::<DbResult<BTreeMap<_, _>>>()
        })?;

        let persistence = match codec {
            Some(codec) => Some(Persistence {
                queue: Arc::new(WriteQueue::start(config.worker_name.clone(), span.clone())?),
                codec: Arc::new(codec),
            }),
            None => None,
        };

        let db = Database {
            collections,
            persistence,
            span,
        };
        info!(
            parent: &db.span,
            collections = db.collections.len(),
            records = db.total_records(),
            persistent = db.is_persistent(),
            "database opened"
        );
        Ok(db)
    }
}

impl fmt::Debug for DatabaseBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.registrations.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("DatabaseBuilder")
            .field("config", &self.config)
            .field("collections", &names)
            .finish()
    }
}

fn hydrate<R: Record>(
    name: &str,
    codec: Option<&DiskCodec>,
) -> DbResult<Arc<dyn ErasedCollection>> {
    let records = match codec {
        Some(codec) => codec.load::<R>(name)?,
        None => Vec::new(),
    };
    let collection = IndexedCollection::from_records(records)?;
    Ok(Arc::new(CollectionSlot::new(name, collection)))
}

#[cfg(test)]
mod tests {
    use punch_types::{Employee, Project, RecordId};

    use super::*;

    fn memory_db() -> Database {
        Database::builder(DatabaseConfig::memory())
            .collection::<Employee>("employees")
            .collection::<Project>("projects")
            .open()
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn lists_collections_sorted() {
        let db = memory_db();
        assert_eq!(db.collection_names(), vec!["employees", "projects"]);
        assert!(db.is_empty());
        assert!(!db.is_persistent());
        assert_eq!(db.directory(), None);
        assert_eq!(db.pending_writes(), 0);
    }

    #[test]
    fn unknown_collection() {
        let db = memory_db();
        let err = db.data_access::<Employee>("payroll").unwrap_err();
        assert!(matches!(err, DbError::UnknownCollection { ref name } if name == "payroll"));
        assert!(db.len_of("payroll").is_err());
    }

    #[test]
    fn type_mismatch_names_both_types() {
        let db = memory_db();
        let err = db.data_access::<Project>("employees").unwrap_err();
        match err {
            DbError::CollectionTypeMismatch {
                name,
                requested,
                actual,
            } => {
                assert_eq!(name, "employees");
                assert!(requested.ends_with("Project"));
                assert!(actual.ends_with("Employee"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_registration_rejected() {
        let err = Database::builder(DatabaseConfig::memory())
            .collection::<Employee>("employees")
            .collection::<Employee>("employees")
            .open()
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateCollection { .. }));
    }

    #[test]
    fn invalid_name_rejected() {
        for bad in ["", "../escape", "a/b"] {
            let err = Database::builder(DatabaseConfig::memory())
                .collection::<Employee>(bad)
                .open()
                .unwrap_err();
            assert!(matches!(err, DbError::InvalidCollectionName(_)), "{bad:?}");
        }
    }

    // -----------------------------------------------------------------------
    // Handles and copies
    // -----------------------------------------------------------------------

    #[test]
    fn handles_share_one_collection() {
        let db = memory_db();
        let a = db.data_access::<Employee>("employees").unwrap();
        let b = db.data_access::<Employee>("employees").unwrap();
        a.act_on(|c| Ok(c.add(Employee::new(c.next_index()?, "Alice"))?))
            .unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(db.len_of("employees").unwrap(), 1);
        assert_eq!(db.total_records(), 1);
        assert!(!db.is_empty());
    }

    #[test]
    fn copy_is_independent_both_ways() {
        let db = memory_db();
        let employees = db.data_access::<Employee>("employees").unwrap();
        employees
            .act_on(|c| Ok(c.add(Employee::new(c.next_index()?, "Alice"))?))
            .unwrap();

        let copy = db.copy();
        let copied = copy.data_access::<Employee>("employees").unwrap();
        let id = copied
            .act_on(|c| {
                let id = c.next_index()?;
                c.add(Employee::new(id, "Bob"))?;
                Ok(id)
            })
            .unwrap();
        assert_eq!(id, RecordId::new(2));
        employees
            .act_on(|c| Ok(c.remove_id(RecordId::new(1)).map(drop)?))
            .unwrap();

        assert_eq!(employees.len(), 0);
        assert_eq!(copied.len(), 2);
        assert!(!copy.is_persistent());
    }

    #[test]
    fn mutation_locks_are_per_collection() {
        let db = memory_db();
        let projects = db.data_access::<Project>("projects").unwrap();
        let employees = db.data_access::<Employee>("employees").unwrap();

        let hired = projects
            .act_on(|p| {
                p.add(Project::new(p.next_index()?, "Apollo"))?;
                // only `projects` is locked here
                employees.act_on(|c| Ok(c.add(Employee::new(c.next_index()?, "Alice"))?))?;
                Ok(employees.len())
            })
            .unwrap();
        assert_eq!(hired, 1);

        let copy = db.copy();
        assert_eq!(copy.len_of("employees").unwrap(), 1);
        assert_eq!(copy.len_of("projects").unwrap(), 1);
    }

    #[test]
    fn stop_and_flush_are_no_ops_in_memory() {
        let db = memory_db();
        db.flush().unwrap();
        db.stop();
        db.stop();
        let employees = db.data_access::<Employee>("employees").unwrap();
        employees
            .act_on(|c| Ok(c.add(Employee::new(c.next_index()?, "Alice"))?))
            .unwrap();
    }
}
