//! Blocks mutation while the target application is running.
//!
//! A locked shim library is the signal that the target is running. When any
//! of a selection's files is locked the user is asked to close the target and
//! retry, or to cancel. Retries are unbounded; only the user ends the loop.

use tracing::{info, warn};

use crate::probe;
use crate::selection::TargetSelection;
use crate::APP_NAME;

/// Icon shown next to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptIcon {
    Error,
    Warning,
    Information,
}

/// Content of the "target is running" prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPrompt {
    pub title: String,
    pub icon: PromptIcon,
    pub message: String,
    pub retry_label: String,
    pub cancel_label: String,
}

impl LockPrompt {
    pub fn for_selection(selection: &TargetSelection) -> Self {
        LockPrompt {
            title: APP_NAME.to_string(),
            icon: PromptIcon::Error,
            message: format!(
                "ERROR: {} is currently running!\n\nPlease close the program/game to continue . . . ",
                selection.name
            ),
            retry_label: "Retry".to_string(),
            cancel_label: "Cancel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Retry,
    Cancel,
}

/// Blocking UI callback for the "target is running" prompt.
pub trait ConfirmPrompt {
    fn confirm(&mut self, prompt: &LockPrompt) -> PromptChoice;
}

impl<F> ConfirmPrompt for F
where
    F: FnMut(&LockPrompt) -> PromptChoice,
{
    fn confirm(&mut self, prompt: &LockPrompt) -> PromptChoice {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Abort,
}

/// Check that `selection` is not running, prompting until it is closed or the
/// user cancels.
///
/// Must be called immediately before every mutation batch: the result says
/// nothing about the files a moment later.
pub fn confirm_target_closed<P>(selection: &TargetSelection, prompt: &mut P) -> GateDecision
where
    P: ConfirmPrompt + ?Sized,
{
    loop {
        let locked = probe::locked_files(&selection.files);
        if locked.is_empty() {
            return GateDecision::Proceed;
        }

        warn!(
            target_name = %selection.name,
            locked = ?locked,
            "target files are in use"
        );

        match prompt.confirm(&LockPrompt::for_selection(selection)) {
            PromptChoice::Retry => continue,
            PromptChoice::Cancel => {
                info!(target_name = %selection.name, "user canceled while target was running");
                return GateDecision::Abort;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs2::FileExt;
    use std::fs::{self, OpenOptions};
    use tempfile::tempdir;

    #[test]
    fn unlocked_selection_proceeds_without_prompt() {
        let dir = tempdir().unwrap();
        let dll = dir.path().join("steam_api.dll");
        fs::write(&dll, b"shim").unwrap();
        let selection = TargetSelection::new("Portal", [dll]);

        let mut prompts = 0;
        let decision = confirm_target_closed(&selection, &mut |_: &LockPrompt| {
            prompts += 1;
            PromptChoice::Cancel
        });

        assert_eq!(decision, GateDecision::Proceed);
        assert_eq!(prompts, 0);
    }

    #[test]
    fn cancel_aborts() {
        let dir = tempdir().unwrap();
        let dll = dir.path().join("steam_api.dll");
        fs::write(&dll, b"shim").unwrap();
        let holder = OpenOptions::new().read(true).write(true).open(&dll).unwrap();
        holder.lock_exclusive().unwrap();
        let selection = TargetSelection::new("Portal", [dll]);

        let mut seen = Vec::new();
        let decision = confirm_target_closed(&selection, &mut |p: &LockPrompt| {
            seen.push(p.clone());
            PromptChoice::Cancel
        });

        assert_eq!(decision, GateDecision::Abort);
        assert_eq!(seen.len(), 1);
        assert!(seen[0].message.contains("Portal is currently running"));
        assert_eq!(seen[0].retry_label, "Retry");
        assert_eq!(seen[0].cancel_label, "Cancel");
        assert_eq!(seen[0].icon, PromptIcon::Error);
    }

    #[test]
    fn retry_rechecks_until_released() {
        let dir = tempdir().unwrap();
        let dll = dir.path().join("steam_api.dll");
        fs::write(&dll, b"shim").unwrap();
        let selection = TargetSelection::new("Portal", [dll.clone()]);

        let mut holder = Some({
            let file = OpenOptions::new().read(true).write(true).open(&dll).unwrap();
            file.lock_exclusive().unwrap();
            file
        });
        let mut prompts = 0;
        let decision = confirm_target_closed(&selection, &mut |_: &LockPrompt| {
            prompts += 1;
            // Target exits on the third prompt
            if prompts == 3 {
                holder.take();
            }
            PromptChoice::Retry
        });

        assert_eq!(decision, GateDecision::Proceed);
        assert_eq!(prompts, 3);
    }
}
