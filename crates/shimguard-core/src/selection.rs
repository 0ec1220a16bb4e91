use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::probe;
use crate::Result;

/// One patchable application and the files a patch may touch.
///
/// Built by discovery code outside this crate and only read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelection {
    pub name: String,
    /// Ordered, duplicate-free list of files checked for locks and mutated.
    pub files: Vec<PathBuf>,
}

impl TargetSelection {
    pub fn new<I, P>(name: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut unique: Vec<PathBuf> = Vec::new();
        for file in files {
            let file = file.into();
            if !unique.contains(&file) {
                unique.push(file);
            }
        }
        TargetSelection {
            name: name.into(),
            files: unique,
        }
    }

    /// Recomputed on every call; never cache the answer across a prompt.
    pub fn files_currently_locked(&self) -> bool {
        self.files.iter().any(|file| probe::is_locked(file))
    }
}

/// A list of selections as handed over by the discovery step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCatalog {
    pub targets: Vec<TargetSelection>,
}

impl TargetCatalog {
    pub fn load(path: &Path) -> Result<TargetCatalog> {
        let content = fs::read_to_string(path)?;
        let mut catalog: TargetCatalog = serde_json::from_str(&content)?;
        // Re-normalize, the file may list a path twice
        catalog.targets = catalog
            .targets
            .into_iter()
            .map(|t| TargetSelection::new(t.name, t.files))
            .collect();
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&TargetSelection> {
        self.targets
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}
