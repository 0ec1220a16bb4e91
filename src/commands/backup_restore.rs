use std::path::Path;

use shimguard_core::backup;
use shimguard_core::instance::InstanceGuard;
use shimguard_core::probe::is_locked;
use shimguard_core::{Error, Result};
use tracing::warn;

/// Restore a single file from its backup, refusing while it is in use.
///
/// Takes the instance lock as proof that no session is mutating files.
pub fn run(_owner: &InstanceGuard, file: &Path) -> Result<()> {
    if is_locked(file) {
        warn!(path = %file.display(), "file in use, restore refused");
        return Err(Error::FileLocked {
            path: file.to_path_buf(),
        });
    }
    backup::restore(file)
}
