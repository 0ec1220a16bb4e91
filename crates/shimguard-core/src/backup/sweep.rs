//! Recursive scans for files left behind by earlier runs.
//!
//! Backup records are meant to outlive the process. Staging files
//! (`.shimguard-*`) normally do not, but a process killed mid-copy never gets
//! to delete them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::backup::constants::{BACKUP_SUFFIX, TEMP_PREFIX};

/// Find every backup record under `root`, recursively.
///
/// Returns the *original* paths (suffix stripped), sorted. Symlinked
/// directories are not followed.
pub fn find_backups(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut originals = Vec::new();
    scan(root, &mut |dir, name| {
        if let Some(original) = strip_suffix(name) {
            originals.push(dir.join(original));
        }
    })?;
    originals.sort();
    Ok(originals)
}

/// Find staging files under `root` that an interrupted run left behind.
pub fn find_leftover_temps(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut temps = Vec::new();
    scan(root, &mut |dir, name| {
        if name.starts_with(TEMP_PREFIX) {
            temps.push(dir.join(name));
        }
    })?;
    temps.sort();
    Ok(temps)
}

/// Delete leftover staging files under `root`. Returns how many were removed.
///
/// Must only run while holding the instance lock, when no copy can be in
/// flight.
pub fn remove_leftover_temps(root: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for temp in find_leftover_temps(root)? {
        match fs::remove_file(&temp) {
            Ok(()) => {
                info!(path = %temp.display(), "removed leftover staging file");
                removed += 1;
            }
            Err(e) => warn!(path = %temp.display(), error = %e, "could not remove staging file"),
        }
    }
    Ok(removed)
}

fn scan(dir: &Path, visit: &mut dyn FnMut(&Path, &str)) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            scan(&entry.path(), visit)?;
        } else if file_type.is_file() {
            visit(dir, &entry.file_name().to_string_lossy());
        }
    }
    Ok(())
}

fn strip_suffix(name: &str) -> Option<&str> {
    name.strip_suffix(BACKUP_SUFFIX)
        .filter(|original| !original.is_empty())
}
