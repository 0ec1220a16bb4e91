//! One installer process per machine.
//!
//! The guard takes an exclusive OS lock on a lock file whose name is fixed
//! for every copy of this program, so the only possible contender is another
//! shimguard process. The lock is held until the guard is dropped.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Name of the single-instance lock. Must stay stable across releases.
pub const INSTANCE_LOCK_NAME: &str = "shimguard";

/// Exclusive ownership of the single-instance lock.
#[derive(Debug)]
pub struct InstanceGuard {
    file: File,
    path: PathBuf,
}

impl InstanceGuard {
    /// Acquire the lock in the default location.
    pub fn acquire() -> Result<InstanceGuard> {
        Self::acquire_in(&default_lock_dir())
    }

    /// Acquire the lock in `dir`. Never waits: a held lock fails immediately
    /// with [`Error::SecondInstance`].
    pub fn acquire_in(dir: &Path) -> Result<InstanceGuard> {
        fs::create_dir_all(dir)?;
        let path = lock_file_path(dir);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        if let Err(e) = file.try_lock_exclusive() {
            return Err(lock_error(&path, e));
        }

        debug!(lock = %path.display(), "instance lock acquired");
        Ok(InstanceGuard { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        // The lock file stays on disk; deleting it would race with the next acquirer
        debug!(lock = %self.path.display(), "instance lock released");
    }
}

/// Only contention means another instance; any other failure is real.
fn lock_error(path: &Path, e: io::Error) -> Error {
    let contended = fs2::lock_contended_error();
    let is_contention = match (e.raw_os_error(), contended.raw_os_error()) {
        (Some(code), Some(expected)) => code == expected,
        _ => e.kind() == contended.kind(),
    };
    if is_contention {
        info!(lock = %path.display(), "another instance holds the lock");
        Error::SecondInstance
    } else {
        warn!(lock = %path.display(), error = %e, "instance lock failed");
        Error::Io(e)
    }
}

pub fn lock_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.lock", INSTANCE_LOCK_NAME))
}

fn default_lock_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(INSTANCE_LOCK_NAME))
        .unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempdir().unwrap();
        let first = InstanceGuard::acquire_in(dir.path()).unwrap();

        let second = InstanceGuard::acquire_in(dir.path());
        assert!(matches!(second, Err(Error::SecondInstance)));

        drop(first);
        assert!(InstanceGuard::acquire_in(dir.path()).is_ok());
    }

    #[test]
    fn only_contention_means_second_instance() {
        let path = Path::new("shimguard.lock");

        let contended = lock_error(path, fs2::lock_contended_error());
        assert!(matches!(contended, Error::SecondInstance));

        let unsupported = io::Error::new(io::ErrorKind::Unsupported, "locks not supported");
        assert!(matches!(lock_error(path, unsupported), Error::Io(_)));
    }

    #[test]
    fn lock_file_persists_after_release() {
        let dir = tempdir().unwrap();
        let guard = InstanceGuard::acquire_in(dir.path()).unwrap();
        let path = guard.path().to_path_buf();
        drop(guard);

        assert_eq!(path, dir.path().join("shimguard.lock"));
        assert!(path.exists());
    }

    #[test]
    fn creates_missing_lock_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let guard = InstanceGuard::acquire_in(&nested).unwrap();
        assert!(guard.path().starts_with(&nested));
    }
}
