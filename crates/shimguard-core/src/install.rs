//! Install and uninstall batches for one target.
//!
//! Install: gate, then for each file back it up and write the replacement.
//! Uninstall: gate, then restore every file that has a backup.
//!
//! Writes go through a temporary file renamed into place, so at any moment a
//! file is either its original self or mutated with a backup beside it. When
//! a batch fails or is canceled half-way, files mutated earlier in the same
//! batch are restored before the error is returned.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::backup;
use crate::gate::{self, ConfirmPrompt, GateDecision};
use crate::selection::TargetSelection;
use crate::session::SessionContext;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressAction {
    BackingUp,
    /// Backup left by an earlier install is kept as-is
    KeepingBackup,
    Writing,
    Restoring,
    Skipping,
}

impl fmt::Display for ProgressAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressAction::BackingUp => write!(f, "Backing up"),
            ProgressAction::KeepingBackup => write!(f, "Keeping backup"),
            ProgressAction::Writing => write!(f, "Writing"),
            ProgressAction::Restoring => write!(f, "Restoring"),
            ProgressAction::Skipping => write!(f, "Skipping"),
        }
    }
}

/// Progress on one file of a batch
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub file: &'a Path,
    pub index: usize,
    pub total: usize,
    pub action: ProgressAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed { files_changed: usize },
    /// The user canceled at the liveness gate; nothing was touched
    Aborted,
}

/// Source of replacement bytes for a target file.
pub trait ShimPayload {
    /// Replacement contents for `file`, or `None` to leave it alone.
    fn replacement(&self, file: &Path) -> Result<Option<Vec<u8>>>;
}

/// Replacement files kept in a directory, matched by file name.
#[derive(Debug, Clone)]
pub struct DirectoryPayload {
    dir: PathBuf,
}

impl DirectoryPayload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryPayload { dir: dir.into() }
    }
}

impl ShimPayload for DirectoryPayload {
    fn replacement(&self, file: &Path) -> Result<Option<Vec<u8>>> {
        let Some(name) = file.file_name() else {
            return Ok(None);
        };
        let candidate = self.dir.join(name);
        if !candidate.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read(candidate)?))
    }
}

/// Install `payload` into `selection`'s files.
pub fn install<P, Y, F>(
    ctx: &SessionContext,
    selection: &TargetSelection,
    payload: &Y,
    prompt: &mut P,
    mut on_progress: Option<F>,
) -> Result<BatchOutcome>
where
    P: ConfirmPrompt + ?Sized,
    Y: ShimPayload + ?Sized,
    F: FnMut(Progress),
{
    ctx.check_canceled()?;
    if gate::confirm_target_closed(selection, prompt) == GateDecision::Abort {
        return Ok(BatchOutcome::Aborted);
    }

    let total = selection.files.len();
    // Files mutated in this batch whose backup was created by this batch
    let mut fresh_backups: Vec<&Path> = Vec::new();
    let mut files_changed = 0;

    for (index, file) in selection.files.iter().enumerate() {
        let mut report = |action| {
            if let Some(ref mut callback) = on_progress {
                callback(Progress {
                    file,
                    index,
                    total,
                    action,
                });
            }
        };

        let step = ctx.check_canceled().and_then(|()| {
            if !file.is_file() {
                return Ok(None);
            }
            payload.replacement(file)
        });
        let replacement = match step {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                report(ProgressAction::Skipping);
                continue;
            }
            Err(e) => return abort_batch(&fresh_backups, e),
        };

        let created = if backup::has_backup(file) {
            report(ProgressAction::KeepingBackup);
            false
        } else {
            report(ProgressAction::BackingUp);
            if let Err(e) = backup::backup(file) {
                return abort_batch(&fresh_backups, e);
            }
            true
        };
        if created {
            fresh_backups.push(file);
        }

        report(ProgressAction::Writing);
        if let Err(e) = write_replacement(file, &replacement) {
            return abort_batch(&fresh_backups, e);
        }
        files_changed += 1;
    }

    info!(target_name = %selection.name, files_changed, "install complete");
    Ok(BatchOutcome::Completed { files_changed })
}

/// Restore every file of `selection` that has a backup.
pub fn uninstall<P, F>(
    ctx: &SessionContext,
    selection: &TargetSelection,
    prompt: &mut P,
    mut on_progress: Option<F>,
) -> Result<BatchOutcome>
where
    P: ConfirmPrompt + ?Sized,
    F: FnMut(Progress),
{
    ctx.check_canceled()?;
    if gate::confirm_target_closed(selection, prompt) == GateDecision::Abort {
        return Ok(BatchOutcome::Aborted);
    }

    let total = selection.files.len();
    let mut files_changed = 0;
    for (index, file) in selection.files.iter().enumerate() {
        ctx.check_canceled()?;

        let action = if backup::has_backup(file) {
            ProgressAction::Restoring
        } else {
            ProgressAction::Skipping
        };
        if let Some(ref mut callback) = on_progress {
            callback(Progress {
                file,
                index,
                total,
                action,
            });
        }

        if action == ProgressAction::Restoring {
            backup::restore(file)?;
            files_changed += 1;
        }
    }

    info!(target_name = %selection.name, files_changed, "uninstall complete");
    Ok(BatchOutcome::Completed { files_changed })
}

/// Restore every backup found under `root`, whatever target it belonged to,
/// and delete staging files an interrupted run left there.
///
/// Callers must hold the instance lock.
pub fn uninstall_orphans<P, F>(
    ctx: &SessionContext,
    root: &Path,
    prompt: &mut P,
    on_progress: Option<F>,
) -> Result<BatchOutcome>
where
    P: ConfirmPrompt + ?Sized,
    F: FnMut(Progress),
{
    let originals = backup::find_backups(root)?;
    let outcome = if originals.is_empty() {
        BatchOutcome::Completed { files_changed: 0 }
    } else {
        let selection = TargetSelection::new(root.display().to_string(), originals);
        uninstall(ctx, &selection, prompt, on_progress)?
    };

    if outcome != BatchOutcome::Aborted {
        let removed = backup::remove_leftover_temps(root)?;
        if removed > 0 {
            info!(root = %root.display(), removed, "leftover staging files removed");
        }
    }
    Ok(outcome)
}

/// Roll back the files mutated so far in the batch, then fail with `cause`.
///
/// Every file is attempted even when an earlier restore fails; the ones that
/// could not be restored are reported alongside the cause.
fn abort_batch(fresh_backups: &[&Path], cause: Error) -> Result<BatchOutcome> {
    warn!(error = %cause, files = fresh_backups.len(), "install failed, rolling back");
    let mut failed = Vec::new();
    for file in fresh_backups.iter().rev() {
        if let Err(e) = backup::restore(file) {
            error!(path = %file.display(), error = %e, "rollback failed");
            failed.push(file.to_path_buf());
        }
    }

    if failed.is_empty() {
        return Err(cause);
    }
    failed.reverse();
    Err(Error::RollbackFailed {
        cause: Box::new(cause),
        failed,
    })
}

/// Atomically replace `path` with `contents`, keeping its permissions.
fn write_replacement(path: &Path, contents: &[u8]) -> Result<()> {
    let permissions = fs::metadata(path)?.permissions();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(backup::TEMP_PREFIX)
        .tempfile_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    fs::set_permissions(staged.path(), permissions)?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
