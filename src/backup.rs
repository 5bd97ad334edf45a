//! Backup-rotate file replacement.
//!
//! Replacing a collection file goes through three names:
//! ```text
//! products.json       # live contents
//! products.json.bak   # previous contents while a write is in flight
//! products.json.tmp   # new contents before they are renamed into place
//! ```
//!
//! The previous contents are moved aside, the new contents are written to the
//! temp file, synced and renamed over the live name, and the backup is removed.
//! If writing fails the backup is renamed back. A crash mid-write leaves the
//! backup behind; the document store picks it up on the next load.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Suffix of the file holding the previous contents during a write.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Suffix of the file receiving the new contents during a write.
pub const TEMP_SUFFIX: &str = ".tmp";

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns the backup path for `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, BACKUP_SUFFIX)
}

/// Returns the temp path for `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, TEMP_SUFFIX)
}

/// Replaces the contents of `path`, keeping the old contents until the new
/// ones are in place.
pub fn atomic_replace(path: &Path, contents: &[u8]) -> Result<()> {
    let backup = backup_path(path);

    let rotated = match fs::rename(path, &backup) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            create_placeholder(path)?;
            false
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if let Err(e) = write_synced(path, contents) {
        if rotated {
            if let Err(restore) = fs::rename(&backup, path) {
                tracing::warn!(
                    path = %path.display(),
                    "Failed to restore backup, previous contents left in {}: {}",
                    backup.display(),
                    restore
                );
            }
        }
        return Err(e);
    }

    if rotated {
        if let Err(e) = fs::remove_file(&backup) {
            tracing::warn!(
                path = %backup.display(),
                "Failed to remove backup after write: {}",
                e
            );
        }
    }

    Ok(())
}

/// Moves an orphaned backup back to `path`.
///
/// Used when the live file is missing or unreadable but its backup survived
/// an interrupted write.
pub fn restore_backup(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    fs::rename(&backup, path).map_err(|e| StoreError::io(backup, e))
}

fn create_placeholder(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    File::create(path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn write_synced(path: &Path, contents: &[u8]) -> Result<()> {
    let temp = temp_path(path);

    let written = File::create(&temp).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::io(temp, e));
    }

    // Rename to final path (atomic on most filesystems)
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::io(path, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (PathBuf, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("recipes.json");
        (path, temp_dir)
    }

    #[test]
    fn test_backup_and_temp_paths() {
        let path = Path::new("/data/shoppingLists.json");
        assert_eq!(
            backup_path(path),
            PathBuf::from("/data/shoppingLists.json.bak")
        );
        assert_eq!(temp_path(path), PathBuf::from("/data/shoppingLists.json.tmp"));
    }

    #[test]
    fn test_replace_creates_missing_file_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("data").join("menus.json");

        atomic_replace(&path, b"[]").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"[]");
        assert!(!backup_path(&path).exists());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_replace_overwrites_and_removes_backup() {
        let (path, _temp) = setup();
        fs::write(&path, b"old").unwrap();

        atomic_replace(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert!(!backup_path(&path).exists());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_failed_write_restores_original() {
        let (path, _temp) = setup();
        fs::write(&path, b"original").unwrap();
        // A directory squatting on the temp name makes the write fail
        fs::create_dir(temp_path(&path)).unwrap();

        let result = atomic_replace(&path, b"replacement");

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(fs::read(&path).unwrap(), b"original");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_stale_backup_is_replaced() {
        let (path, _temp) = setup();
        fs::write(&path, b"current").unwrap();
        fs::write(backup_path(&path), b"stale").unwrap();

        atomic_replace(&path, b"next").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"next");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_restore_backup() {
        let (path, _temp) = setup();
        fs::write(backup_path(&path), b"saved").unwrap();

        restore_backup(&path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"saved");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_restore_backup_missing() {
        let (path, _temp) = setup();
        assert!(restore_backup(&path).is_err());
    }
}
