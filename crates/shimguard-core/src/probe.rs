//! Exclusive-open test for "is this file in use?".
//!
//! On Windows the file is opened with no sharing at all, which fails while
//! any other handle is open. Elsewhere there is no mandatory sharing mode, so
//! the probe opens the file read/write and asks for a non-blocking exclusive
//! lock instead.
//!
//! The answer is only valid at the instant it is computed: callers re-probe
//! right before each mutation batch instead of caching it.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Returns true if `path` is currently held by another process.
///
/// A missing file is never locked. Any other failure to open the file
/// exclusively counts as locked.
pub fn is_locked(path: &Path) -> bool {
    match open_exclusive(path) {
        Ok(file) => {
            let _ = file.unlock();
            false
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "file is locked");
            true
        }
    }
}

/// Subset of `paths` that are currently locked, in input order.
pub fn locked_files<'a, I>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    paths
        .into_iter()
        .filter(|path| is_locked(path))
        .cloned()
        .collect()
}

#[cfg(windows)]
fn open_exclusive(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .write(true)
        .share_mode(0)
        .open(path)
}

#[cfg(not(windows))]
fn open_exclusive(path: &Path) -> io::Result<File> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    file.try_lock_exclusive()?;
    Ok(file)
}
