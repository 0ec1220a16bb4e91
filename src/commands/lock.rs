//! Instance lock for the one-shot commands that change files.
//!
//! `backup create` and `backup restore` must never run while an install or
//! uninstall session owns the target, so they take the same lock.

use shimguard_core::instance::InstanceGuard;
use shimguard_core::{Error, Result};
use tracing::info;

/// Run `op` while holding the instance lock.
///
/// Returns `Ok(None)` without running `op` when another instance owns the
/// lock.
pub fn exclusive<T, F>(acquired: Result<InstanceGuard>, op: F) -> Result<Option<T>>
where
    F: FnOnce(&InstanceGuard) -> Result<T>,
{
    let guard = match acquired {
        Ok(guard) => guard,
        Err(Error::SecondInstance) => {
            info!("another instance is running, nothing done");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    op(&guard).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::backup_restore;
    use shimguard_core::backup;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn restore_skipped_while_session_owns_lock() {
        let locks = tempdir().unwrap();
        let game = tempdir().unwrap();
        let file = game.path().join("steam_api.dll");
        fs::write(&file, b"original").unwrap();
        backup::backup(&file).unwrap();
        fs::write(&file, b"shim").unwrap();

        let _session = InstanceGuard::acquire_in(locks.path()).unwrap();
        let result = exclusive(InstanceGuard::acquire_in(locks.path()), |owner| {
            backup_restore::run(owner, &file)
        })
        .unwrap();

        assert!(result.is_none());
        assert_eq!(fs::read(&file).unwrap(), b"shim");
        assert!(backup::has_backup(&file));
    }

    #[test]
    fn runs_when_lock_is_free() {
        let locks = tempdir().unwrap();
        let result = exclusive(InstanceGuard::acquire_in(locks.path()), |_| Ok(7)).unwrap();
        assert_eq!(result, Some(7));
        // Released again afterwards
        assert!(InstanceGuard::acquire_in(locks.path()).is_ok());
    }

    #[test]
    fn other_lock_errors_propagate() {
        let failed = Err(Error::Io(std::io::Error::other("no locks available")));
        let result = exclusive(failed, |_| Ok(()));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
