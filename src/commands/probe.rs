use std::path::{Path, PathBuf};

use shimguard_core::backup::has_backup;
use shimguard_core::probe::is_locked;

/// Lock and backup state of one file, as seen right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub locked: bool,
    pub backed_up: bool,
}

pub fn run(files: &[PathBuf]) -> Vec<FileStatus> {
    files.iter().map(|file| status(file)).collect()
}

fn status(path: &Path) -> FileStatus {
    FileStatus {
        path: path.to_path_buf(),
        exists: path.exists(),
        locked: is_locked(path),
        backed_up: has_backup(path),
    }
}
