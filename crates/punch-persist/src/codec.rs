use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use punch_types::{Record, RecordId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{PersistError, Result};
use crate::format;

/// Extension of record files.
pub const RECORD_EXTENSION: &str = "db";
/// Suffix of the scratch file a record is written to before being renamed
/// into place.
const TEMP_SUFFIX: &str = "tmp";

/// Flush strategy for record files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` every record file before it is renamed into place.
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    #[default]
    OsDefault,
}

/// Directory layout and file format for persisted records.
///
/// Records live at `<root>/<collection>/<id>.db`. Each write replaces the
/// whole file: the text goes to `<id>.db.tmp` first and is then renamed over
/// the real file, so a crash mid-write leaves either the old or the new
/// record, never a torn one.
#[derive(Clone, Debug)]
pub struct DiskCodec {
    root: PathBuf,
    sync: SyncMode,
}

impl DiskCodec {
    pub fn new(root: impl Into<PathBuf>, sync: SyncMode) -> Self {
        Self {
            root: root.into(),
            sync,
        }
    }

    /// Root directory of the database.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync
    }

    /// Directory holding one collection's record files.
    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    /// Path of the file for one record.
    pub fn record_path(&self, collection: &str, id: RecordId) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{id}.{RECORD_EXTENSION}"))
    }

    // -----------------------------------------------------------------------
    // Text form
    // -----------------------------------------------------------------------

    /// Render a record in its on-disk text form.
    pub fn serialize<R: Record>(record: &R) -> String {
        let fields = record.to_fields();
        debug_assert!(
            fields.iter().map(|(key, _)| *key).eq(R::KEYS.iter().copied()),
            "to_fields of {} does not follow its declared KEYS",
            std::any::type_name::<R>()
        );
        format::encode_line(&fields)
    }

    /// Rebuild a record from its on-disk text form. `path` names the file in
    /// the error if the text is unusable.
    pub fn deserialize<R: Record>(text: &str, path: &Path) -> Result<R> {
        let fields = format::decode_line(text).map_err(|reason| corrupted(path, reason))?;
        R::from_fields(&fields).map_err(|e| corrupted(path, e.to_string()))
    }

    // -----------------------------------------------------------------------
    // File operations
    // -----------------------------------------------------------------------

    /// Serialize and write one record, replacing any previous file.
    pub fn write<R: Record>(&self, record: &R, collection: &str) -> Result<()> {
        self.write_text(collection, record.id(), &Self::serialize(record))
    }

    /// Write already-serialized record text, replacing any previous file.
    pub fn write_text(&self, collection: &str, id: RecordId, text: &str) -> Result<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir)?;

        let path = self.record_path(collection, id);
        let scratch = dir.join(format!("{id}.{RECORD_EXTENSION}.{TEMP_SUFFIX}"));
        {
            let mut writer = BufWriter::new(File::create(&scratch)?);
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
            if matches!(self.sync, SyncMode::EveryWrite) {
                writer.get_ref().sync_all()?;
            }
        }
        fs::rename(&scratch, &path)?;

        debug!(collection, %id, bytes = text.len(), "record written");
        Ok(())
    }

    /// Remove one record's file. Returns `false` if there was no file.
    pub fn delete(&self, id: RecordId, collection: &str) -> Result<bool> {
        let path = self.record_path(collection, id);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(collection, %id, "record deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read one record back, if its file exists.
    pub fn read<R: Record>(&self, collection: &str, id: RecordId) -> Result<Option<R>> {
        let path = self.record_path(collection, id);
        match fs::read(&path) {
            Ok(bytes) => read_record(&path, bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read every record file of a collection, in file-name order.
    ///
    /// A missing collection directory is an empty collection. Entries that
    /// are not `.db` files are skipped with a warning. Any record file that
    /// cannot be read back fails the whole load with
    /// [`PersistError::DatabaseCorrupted`]: skipping it would silently lose
    /// data.
    pub fn load<R: Record>(&self, collection: &str) -> Result<Vec<R>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            debug!(collection, "no directory yet; collection starts empty");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();

            if !entry.file_type().is_file()
                || path.extension() != Some(OsStr::new(RECORD_EXTENSION))
            {
                warn!(path = %path.display(), "ignoring non-record entry");
                continue;
            }

            let stem = path.file_stem().and_then(OsStr::to_str).unwrap_or_default();
            let file_id: RecordId = stem
                .parse()
                .map_err(|_| corrupted(path, "file name is not a record identifier"))?;
            // `007.db` or `+7.db` would load as 7 but never be rewritten or
            // deleted, since every write targets `7.db`.
            if file_id.to_string() != stem {
                return Err(corrupted(path, "file name is not the canonical identifier"));
            }

            let record: R = read_record(path, fs::read(path)?)?;
            if record.id() != file_id {
                return Err(corrupted(
                    path,
                    format!("file is named for id {file_id} but holds id {}", record.id()),
                ));
            }
            records.push(record);
        }

        debug!(collection, count = records.len(), "collection loaded");
        Ok(records)
    }
}

/// Check that a collection name is usable as a single directory name.
pub fn validate_collection_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("collection name is empty".into());
    }
    if name == "." || name == ".." {
        return Err(format!("collection name `{name}` is reserved"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(format!("collection name `{name}` contains a path separator"));
    }
    Ok(())
}

fn read_record<R: Record>(path: &Path, bytes: Vec<u8>) -> Result<R> {
    let text = String::from_utf8(bytes).map_err(|_| corrupted(path, "file is not valid UTF-8"))?;
    DiskCodec::deserialize(&text, path)
}

fn corrupted(path: &Path, reason: impl Into<String>) -> PersistError {
    PersistError::DatabaseCorrupted {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
