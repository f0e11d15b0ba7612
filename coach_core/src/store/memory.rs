//! In-process store, used by tests and embedders that persist elsewhere.

use super::{Store, Tables};
use crate::{Error, Result};
use std::sync::RwLock;

/// Tables held behind a read/write lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing rows
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Copy of the current rows
    pub fn snapshot(&self) -> Result<Tables> {
        self.read(|t| t.clone())
    }
}

impl Store for MemoryStore {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T> {
        let guard = self
            .tables
            .read()
            .map_err(|_| Error::State("memory store lock poisoned".into()))?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| Error::State("memory store lock poisoned".into()))?;

        // Mutate a copy so a failed closure leaves the rows untouched
        let mut working = guard.clone();
        let value = f(&mut working)?;
        working.check_constraints()?;
        *guard = working;
        Ok(value)
    }
}
