//! JSON file store with file locking.
//!
//! The tables are kept in a single JSON document. Writers take an exclusive
//! lock on a sidecar `.lock` file, so read-modify-write cycles from separate
//! processes serialize; the document itself is replaced atomically.

use super::{Store, Tables};
use crate::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File name of the table document inside a data directory
pub const STORE_FILE_NAME: &str = "coach.json";

/// Tables persisted as one JSON file
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Use the given document path
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use `coach.json` inside a data directory
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::open(data_dir.join(STORE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    /// Open (creating if needed) the sidecar lock file
    fn lock_file(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Load tables from disk
    ///
    /// Returns empty tables if the file doesn't exist. A document that fails
    /// to parse is an error: writing over it would lose every row.
    fn load(&self) -> Result<Tables> {
        if !self.path.exists() {
            tracing::debug!("No store file at {:?}, starting empty", self.path);
            return Ok(Tables::default());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;

        if contents.trim().is_empty() {
            return Ok(Tables::default());
        }

        serde_json::from_str::<Tables>(&contents).map_err(|e| {
            tracing::warn!("Failed to parse store file {:?}: {}", self.path, e);
            Error::State(format!("store file {:?} is corrupted: {}", self.path, e))
        })
    }

    /// Save tables atomically
    ///
    /// 1. Write to a temp file in the same directory
    /// 2. Sync to disk
    /// 3. Rename over the original
    fn save(&self, tables: &Tables) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(tables)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", self.path);
        Ok(())
    }
}

impl Store for FileStore {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T> {
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let loaded = self.load();
        lock.unlock()?;
        Ok(f(&loaded?))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;

        let result = self.load().and_then(|mut tables| {
            let value = f(&mut tables)?;
            tables.check_constraints()?;
            self.save(&tables)?;
            Ok(value)
        });

        lock.unlock()?;
        result
    }
}
