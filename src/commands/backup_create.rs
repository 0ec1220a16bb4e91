use std::path::{Path, PathBuf};

use shimguard_core::backup;
use shimguard_core::instance::InstanceGuard;
use shimguard_core::probe::is_locked;
use shimguard_core::{Error, Result};
use tracing::warn;

/// Back up a single file, refusing while it is in use.
///
/// Takes the instance lock as proof that no session is mutating files.
pub fn run(_owner: &InstanceGuard, file: &Path) -> Result<PathBuf> {
    if is_locked(file) {
        warn!(path = %file.display(), "file in use, backup refused");
        return Err(Error::FileLocked {
            path: file.to_path_buf(),
        });
    }
    backup::backup(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn owner() -> (tempfile::TempDir, InstanceGuard) {
        let locks = tempdir().unwrap();
        let guard = InstanceGuard::acquire_in(locks.path()).unwrap();
        (locks, guard)
    }

    #[test]
    fn creates_backup_next_to_file() {
        let dir = tempdir().unwrap();
        let (_locks, guard) = owner();
        let file = dir.path().join("steam_api.dll");
        fs::write(&file, b"original").unwrap();

        let record = run(&guard, &file).unwrap();

        assert_eq!(record, dir.path().join("steam_api.dll.shimguard.backup"));
        assert_eq!(fs::read(record).unwrap(), b"original");
    }

    #[test]
    fn second_backup_is_rejected() {
        let dir = tempdir().unwrap();
        let (_locks, guard) = owner();
        let file = dir.path().join("steam_api.dll");
        fs::write(&file, b"original").unwrap();
        run(&guard, &file).unwrap();

        assert!(matches!(run(&guard, &file), Err(Error::AlreadyBackedUp { .. })));
    }
}
