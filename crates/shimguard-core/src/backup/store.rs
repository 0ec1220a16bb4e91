//! Sibling backups: `<file>` is saved as `<file>.shimguard.backup`.
//!
//! A backup exists for a path if and only if that path has been mutated and
//! not yet restored. Both directions go through a temporary file in the same
//! directory that is verified and then renamed into place, so a crash never
//! leaves a half-written backup or a half-restored original behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::backup::constants::{BACKUP_SUFFIX, TEMP_PREFIX};
use crate::utils::hash::hash_file;
use crate::{Error, Result};

/// Path of the backup record for `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Check whether a backup record exists for `path`.
pub fn has_backup(path: &Path) -> bool {
    record_exists(&backup_path(path))
}

/// Anything at the record path counts, so `backup`, `restore` and
/// `has_backup` always agree on whether a record is there.
fn record_exists(record: &Path) -> bool {
    fs::symlink_metadata(record).is_ok()
}

/// Copy `path` to its backup record.
///
/// Fails with [`Error::AlreadyBackedUp`] if a record already exists; the
/// existing record is left untouched. On any other failure no record is
/// created.
pub fn backup(path: &Path) -> Result<PathBuf> {
    let record = backup_path(path);
    if record_exists(&record) {
        return Err(Error::AlreadyBackedUp {
            path: path.to_path_buf(),
        });
    }

    let staged = stage_copy(path, path).map_err(|e| Error::BackupFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    verify_copy(path, staged.path())?;

    // Publishing must not replace a record that appeared meanwhile
    staged.persist_noclobber(&record).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            Error::AlreadyBackedUp {
                path: path.to_path_buf(),
            }
        } else {
            Error::BackupFailed {
                path: path.to_path_buf(),
                reason: e.error.to_string(),
            }
        }
    })?;

    info!(path = %path.display(), backup = %record.display(), "backup created");
    Ok(record)
}

/// Overwrite `path` with its backup, then delete the backup.
///
/// Fails with [`Error::NoBackupFound`] (leaving `path` alone) when there is no
/// record. The record is only deleted after the overwrite has succeeded, so a
/// failed restore can be retried.
pub fn restore(path: &Path) -> Result<()> {
    let record = backup_path(path);
    if !record_exists(&record) {
        return Err(Error::NoBackupFound {
            path: path.to_path_buf(),
        });
    }

    let restore_failed = |e: &dyn std::fmt::Display| Error::RestoreFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let staged = stage_copy(&record, path).map_err(|e| restore_failed(&e))?;
    verify_copy(&record, staged.path())?;
    staged.persist(path).map_err(|e| restore_failed(&e.error))?;
    debug!(path = %path.display(), "original contents restored");

    fs::remove_file(&record).map_err(|e| {
        restore_failed(&format!(
            "file restored but backup '{}' could not be removed: {}",
            record.display(),
            e
        ))
    })?;

    info!(path = %path.display(), "backup restored");
    Ok(())
}

/// Copy `source` into a synced temporary file next to `beside`.
///
/// The temporary file is deleted automatically if it is dropped unpublished.
fn stage_copy(source: &Path, beside: &Path) -> io::Result<NamedTempFile> {
    let mut input = File::open(source)?;
    let permissions = input.metadata()?.permissions();

    let mut staged = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent_dir(beside))?;
    io::copy(&mut input, staged.as_file_mut())?;
    staged.as_file_mut().flush()?;
    staged.as_file().sync_all()?;
    fs::set_permissions(staged.path(), permissions)?;

    Ok(staged)
}

fn verify_copy(source: &Path, copy: &Path) -> Result<()> {
    let expected = hash_file(source)?;
    let actual = hash_file(copy)?;
    if expected != actual {
        return Err(Error::IntegrityMismatch {
            path: source.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
