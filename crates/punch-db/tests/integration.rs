//! Disk-backed behaviour of the database: write-behind, restart, corruption.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use punch_db::schema::{EMPLOYEES, PROJECTS, TIME_ENTRIES, USERS};
use punch_db::{Database, DatabaseConfig, DbError, DbResult, SyncMode};
use punch_persist::PersistError;
use punch_store::StoreError;
use punch_types::{Employee, Project, RecordId, Role, TimeEntry, User};

fn open(dir: &Path) -> Database {
    Database::open_time_tracking(DatabaseConfig::on_disk(dir)).unwrap()
}

fn hire(db: &Database, name: &str) -> DbResult<RecordId> {
    db.data_access::<Employee>(EMPLOYEES)?.act_on(|c| {
        let id = c.next_index()?;
        c.add(Employee::new(id, name))?;
        Ok(id)
    })
}

fn record_file(dir: &Path, collection: &str, id: u64) -> std::path::PathBuf {
    dir.join(collection).join(format!("{id}.db"))
}

// ---------------------------------------------------------------------------
// Write-behind
// ---------------------------------------------------------------------------

#[test]
fn added_record_reaches_disk_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path());

    let id = hire(&db, "Alice").unwrap();
    assert_eq!(id, RecordId::new(1));

    db.stop();
    let text = fs::read_to_string(record_file(dir.path(), EMPLOYEES, 1)).unwrap();
    assert_eq!(text, "id=1|name=Alice\n");
}

#[test]
fn update_rewrites_and_remove_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path());
    let projects = db.data_access::<Project>(PROJECTS).unwrap();

    projects
        .act_on(|c| {
            c.add(Project::new(c.next_index()?, "Apollo"))?;
            c.add(Project::new(c.next_index()?, "Gemini"))?;
            Ok(())
        })
        .unwrap();
    projects
        .act_on(|c| {
            c.update(Project::new(RecordId::new(1), "Apollo 11"))?;
            c.remove_id(RecordId::new(2))?;
            Ok(())
        })
        .unwrap();
    db.flush().unwrap();

    let first = fs::read_to_string(record_file(dir.path(), PROJECTS, 1)).unwrap();
    assert_eq!(first, "id=1|name=Apollo 11\n");
    assert!(!record_file(dir.path(), PROJECTS, 2).exists());
    db.stop();
}

#[test]
fn add_then_remove_in_one_mutation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path());
    db.data_access::<Employee>(EMPLOYEES)
        .unwrap()
        .act_on(|c| {
            let id = c.next_index()?;
            c.add(Employee::new(id, "Temp"))?;
            c.remove_id(id)?;
            Ok(())
        })
        .unwrap();
    db.stop();
    assert!(!record_file(dir.path(), EMPLOYEES, 1).exists());
}

#[test]
fn failed_mutation_never_reaches_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path());
    hire(&db, "Alice").unwrap();

    let err = db
        .data_access::<Employee>(EMPLOYEES)
        .unwrap()
        .act_on(|c| -> DbResult<()> {
            c.update(Employee::new(RecordId::new(1), "Mallory"))?;
            c.remove_id(RecordId::new(99))?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, DbError::Store(_)));
    db.stop();

    let text = fs::read_to_string(record_file(dir.path(), EMPLOYEES, 1)).unwrap();
    assert_eq!(text, "id=1|name=Alice\n");
}

#[test]
fn act_on_after_stop_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path());
    let employees = db.data_access::<Employee>(EMPLOYEES).unwrap();
    db.stop();

    let err = employees
        .act_on(|c| Ok(c.add(Employee::new(c.next_index()?, "Late"))?))
        .unwrap_err();
    assert!(matches!(err, DbError::Persist(PersistError::QueueStopping)));
    assert!(employees.is_empty());
    // reads still work
    assert_eq!(employees.read(|s| s.len()), 0);
}

#[test]
fn every_write_sync_mode_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::on_disk(dir.path()).with_sync(SyncMode::EveryWrite);
    let db = Database::open_time_tracking(config).unwrap();
    hire(&db, "Alice").unwrap();
    db.stop();
    assert!(record_file(dir.path(), EMPLOYEES, 1).exists());
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_adds_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(open(dir.path()));

    let handles: Vec<_> = ["Alice", "Bob"]
        .into_iter()
        .map(|name| {
            let db = Arc::clone(&db);
            thread::spawn(move || hire(&db, name).unwrap())
        })
        .collect();
    let ids: BTreeSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids, BTreeSet::from([RecordId::new(1), RecordId::new(2)]));

    db.stop();
    assert!(record_file(dir.path(), EMPLOYEES, 1).exists());
    assert!(record_file(dir.path(), EMPLOYEES, 2).exists());
}

#[test]
fn many_threads_mint_a_dense_range() {
    const THREADS: u64 = 16;
    const PER_THREAD: u64 = 20;

    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(open(dir.path()));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| hire(&db, &format!("worker-{t}-{i}")).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: BTreeSet<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .map(RecordId::value)
        .collect();
    assert_eq!(ids, (1..=THREADS * PER_THREAD).collect());

    db.stop();
    let files = fs::read_dir(dir.path().join(EMPLOYEES)).unwrap().count();
    assert_eq!(files as u64, THREADS * PER_THREAD);
}

// ---------------------------------------------------------------------------
// Restart
// ---------------------------------------------------------------------------

#[test]
fn restart_restores_records_and_counter() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = open(dir.path());
        hire(&db, "Alice").unwrap();
        hire(&db, "Bob").unwrap();
        hire(&db, "Carol").unwrap();
        db.data_access::<Employee>(EMPLOYEES)
            .unwrap()
            .act_on(|c| Ok(c.remove_id(RecordId::new(2)).map(drop)?))
            .unwrap();

        let entries = db.data_access::<TimeEntry>(TIME_ENTRIES).unwrap();
        entries
            .act_on(|c| {
                c.add(TimeEntry {
                    id: c.next_index()?,
                    employee: RecordId::new(1),
                    project: RecordId::new(1),
                    minutes: 90,
                    date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    details: "pairing | review = done\nnext line".to_string(),
                })?;
                Ok(())
            })
            .unwrap();
        db.stop();
    }

    let db = open(dir.path());
    let employees = db.data_access::<Employee>(EMPLOYEES).unwrap();
    let names = employees.read(|s| s.iter().map(|e| e.name.clone()).collect::<Vec<_>>());
    assert_eq!(names, vec!["Alice", "Carol"]);

    // next id continues past the highest loaded id
    assert_eq!(hire(&db, "Dave").unwrap(), RecordId::new(4));

    let entry = db
        .data_access::<TimeEntry>(TIME_ENTRIES)
        .unwrap()
        .read(|s| s.get(RecordId::new(1)).cloned())
        .unwrap();
    assert_eq!(entry.details, "pairing | review = done\nnext line");
    assert_eq!(entry.minutes, 90);
    db.stop();
}

#[test]
fn user_without_employee_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let user = User {
        id: RecordId::new(1),
        name: "root".to_string(),
        hash: "abc".to_string(),
        salt: "xyz".to_string(),
        employee: None,
        role: Role::System,
    };
    {
        let db = open(dir.path());
        let stored = user.clone();
        db.data_access::<User>(USERS)
            .unwrap()
            .act_on(move |c| Ok(c.add(stored)?))
            .unwrap();
        db.stop();
    }
    let db = open(dir.path());
    let loaded = db
        .data_access::<User>(USERS)
        .unwrap()
        .read(|s| s.get(RecordId::new(1)).cloned());
    assert_eq!(loaded, Some(user));
}

#[test]
fn corrupted_file_halts_open_and_is_named() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = open(dir.path());
        hire(&db, "Alice").unwrap();
        db.stop();
    }
    let bad = record_file(dir.path(), EMPLOYEES, 1);
    fs::write(&bad, "id=1|nmae=Alice\n").unwrap();

    let err = Database::open_time_tracking(DatabaseConfig::on_disk(dir.path())).unwrap_err();
    assert!(err.is_corruption());
    assert!(err.to_string().contains("1.db"), "{err}");
}

#[test]
fn zero_padded_file_name_halts_open() {
    let dir = tempfile::tempdir().unwrap();
    let employees = dir.path().join(EMPLOYEES);
    fs::create_dir_all(&employees).unwrap();
    fs::write(employees.join("007.db"), "id=7|name=Bond\n").unwrap();

    let err = Database::open_time_tracking(DatabaseConfig::on_disk(dir.path())).unwrap_err();
    assert!(err.is_corruption());
    assert!(err.to_string().contains("007.db"), "{err}");
}

#[test]
fn stored_max_id_stops_minting() {
    let dir = tempfile::tempdir().unwrap();
    let employees = dir.path().join(EMPLOYEES);
    fs::create_dir_all(&employees).unwrap();
    fs::write(employees.join("1.db"), "id=1|name=Alice\n").unwrap();
    fs::write(
        employees.join(format!("{}.db", u64::MAX)),
        format!("id={}|name=Last\n", u64::MAX),
    )
    .unwrap();

    let db = open(dir.path());
    for _ in 0..3 {
        let err = hire(&db, "Overflow").unwrap_err();
        assert!(matches!(err, DbError::Store(StoreError::IdentifiersExhausted)));
    }
    assert_eq!(db.len_of(EMPLOYEES).unwrap(), 2);
    db.stop();
    assert_eq!(fs::read_dir(&employees).unwrap().count(), 2);
}

#[test]
fn copy_of_disk_database_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(dir.path());
    hire(&db, "Alice").unwrap();

    let copy = db.copy();
    assert!(!copy.is_persistent());
    hire(&copy, "Bob").unwrap();
    db.stop();

    assert!(record_file(dir.path(), EMPLOYEES, 1).exists());
    assert!(!record_file(dir.path(), EMPLOYEES, 2).exists());
    assert_eq!(db.len_of(EMPLOYEES).unwrap(), 1);
}

#[test]
fn memory_database_touches_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_time_tracking(DatabaseConfig::memory()).unwrap();
    hire(&db, "Alice").unwrap();
    db.stop();
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(db.directory(), None);
}
