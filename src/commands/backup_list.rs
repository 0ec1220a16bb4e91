use std::io;
use std::path::{Path, PathBuf};

use shimguard_core::backup::find_backups;

/// Original paths of every backup under `root`.
pub fn run(root: &Path) -> io::Result<Vec<PathBuf>> {
    find_backups(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lists_backed_up_originals() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("steam_api.dll"), b"patched").unwrap();
        fs::write(dir.path().join("steam_api.dll.shimguard.backup"), b"original").unwrap();

        let found = run(dir.path()).unwrap();

        assert_eq!(found, vec![dir.path().join("steam_api.dll")]);
    }
}
