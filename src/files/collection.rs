//! One collection of the document store: an in-memory sequence mirrored to a
//! JSON array file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use larder_core::{ProviderRegistry, Record};

use crate::backup;
use crate::error::{Result, StoreError};

/// An ordered collection of records backed by a single JSON file.
///
/// Reads share the lock and never touch disk. Writes hold the exclusive lock
/// across the file replacement, and the in-memory sequence is swapped only
/// after the file was written.
#[derive(Debug)]
pub struct JsonCollection<T> {
    path: PathBuf,
    items: RwLock<Vec<T>>,
}

impl<T: Record> JsonCollection<T> {
    /// Loads the collection file, treating a missing file as empty.
    ///
    /// If the file is missing or malformed but a backup from an interrupted
    /// write parses, the backup is restored and used.
    pub fn load(path: PathBuf) -> Result<Self> {
        let items = match read_items::<T>(&path) {
            Ok(Some(items)) => items,
            Ok(None) => Self::recover(&path)?.unwrap_or_default(),
            Err(e @ StoreError::Json { .. }) => Self::recover(&path)?.ok_or(e)?,
            Err(e) => return Err(e),
        };

        tracing::debug!(
            path = %path.display(),
            "Loaded {} {}",
            items.len(),
            T::COLLECTION
        );

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    fn recover(path: &Path) -> Result<Option<Vec<T>>> {
        let backup = backup::backup_path(path);
        let items = match read_items::<T>(&backup) {
            Ok(Some(items)) => items,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!("Ignoring unreadable backup: {}", e);
                return Ok(None);
            }
        };

        tracing::warn!(
            path = %path.display(),
            "Recovered {} from backup left by an interrupted write",
            T::COLLECTION
        );
        if let Err(e) = backup::restore_backup(path) {
            tracing::warn!("Failed to move backup into place: {}", e);
        }

        Ok(Some(items))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of every record, in stored order.
    pub fn list(&self) -> Vec<T> {
        self.read().clone()
    }

    pub fn lookup(&self, key: &T::Key) -> Option<T> {
        self.read().iter().find(|item| item.key() == *key).cloned()
    }

    /// Inserts or replaces a record and rewrites the collection file.
    ///
    /// Records without a key get a random one that is unused in the
    /// collection.
    pub fn set(&self, mut value: T, providers: &ProviderRegistry) -> Result<T::Key> {
        value.prepare(providers)?;

        let mut items = self.write();

        if value.needs_key() {
            loop {
                value.assign_random_key();
                let key = value.key();
                if !items.iter().any(|item| item.key() == key) {
                    break;
                }
            }
        }

        let key = value.key();
        let mut next = items.clone();
        match next.iter_mut().find(|item| item.key() == key) {
            Some(slot) => *slot = value,
            None => next.push(value),
        }

        self.write_file(&next)?;
        *items = next;

        Ok(key)
    }

    /// Removes a record and rewrites the collection file.
    pub fn delete(&self, key: &T::Key) -> Result<()> {
        let mut items = self.write();

        let index = items
            .iter()
            .position(|item| item.key() == *key)
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, key))?;

        let mut next = items.clone();
        next.remove(index);

        self.write_file(&next)?;
        *items = next;

        Ok(())
    }

    /// Writes the current contents to disk.
    pub fn flush(&self) -> Result<()> {
        let items = self.write();
        self.write_file(&items)
    }

    fn write_file(&self, items: &[T]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(items).map_err(|source| StoreError::Encode {
            collection: T::COLLECTION,
            source,
        })?;

        tracing::trace!(
            path = %self.path.display(),
            "Writing {} {} ({} bytes)",
            items.len(),
            T::COLLECTION,
            bytes.len()
        );

        backup::atomic_replace(&self.path, &bytes)
    }
}

/// Reads a collection file. `Ok(None)` means the file does not exist.
///
/// A blank file counts as an empty collection: it is the placeholder left
/// when the very first write of a collection was interrupted.
fn read_items<T: Record>(path: &Path) -> Result<Option<Vec<T>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Some(Vec::new()));
    }

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}
