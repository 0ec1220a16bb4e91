//! Pieces shared by the interactive install and uninstall commands.

use std::path::Path;

use shimguard_core::install::{BatchOutcome, Progress};
use shimguard_core::selection::{TargetCatalog, TargetSelection};
use shimguard_core::supervisor::SessionFault;

/// Look up `name` in the catalog file. Reloaded on every session attempt.
pub fn load_selection(catalog: &Path, name: &str) -> Result<TargetSelection, SessionFault> {
    let catalog = TargetCatalog::load(catalog)?;
    catalog
        .find(name)
        .cloned()
        .ok_or_else(|| SessionFault::Message(format!("target '{}' not found in catalog", name)))
}

pub fn print_progress(p: Progress<'_>) {
    println!("{} [{}/{}]: {}", p.action, p.index + 1, p.total, p.file.display());
}

pub fn print_outcome(name: &str, verb: &str, outcome: BatchOutcome) {
    match outcome {
        BatchOutcome::Completed { files_changed } => {
            println!("{}: {} {} file(s)", name, verb, files_changed);
        }
        BatchOutcome::Aborted => {
            println!("{}: canceled, no files were changed", name);
        }
    }
}
