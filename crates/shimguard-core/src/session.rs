//! State shared by one interactive session and the process's exit paths.
//!
//! Replaces process-wide globals: the cancellation flag and the optional
//! helper process live here and are passed explicitly to whoever needs them.

use std::process::{Child, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// External command run alongside the session for out-of-band work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    canceled: AtomicBool,
    cleaned_up: AtomicBool,
    helper: Mutex<Option<Child>>,
}

impl SessionContext {
    pub fn new() -> Arc<Self> {
        Arc::new(SessionContext::default())
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Fail with [`Error::Canceled`] once the session has been canceled.
    pub fn check_canceled(&self) -> Result<()> {
        if self.is_canceled() {
            return Err(Error::Canceled);
        }
        Ok(())
    }

    /// Start the helper process, killing any previous one first.
    pub fn spawn_helper(&self, helper: &HelperCommand) -> Result<u32> {
        let mut slot = self.helper_slot();
        if let Some(previous) = slot.take() {
            kill_child(previous);
        }
        let child = Command::new(&helper.program).args(&helper.args).spawn()?;
        let pid = child.id();
        debug!(pid, program = %helper.program, "helper process started");
        *slot = Some(child);
        Ok(pid)
    }

    pub fn has_helper(&self) -> bool {
        self.helper_slot().is_some()
    }

    /// Forcibly stop the helper process, if one is running.
    pub fn kill_helper(&self) {
        if let Some(child) = self.helper_slot().take() {
            kill_child(child);
        }
    }

    /// Prepare for a fresh session attempt after a fault.
    pub fn reset_for_retry(&self) {
        self.kill_helper();
        self.canceled.store(false, Ordering::SeqCst);
    }

    /// Guaranteed cleanup: mark the operation canceled and stop the helper.
    ///
    /// Runs at most once per context no matter how many exit paths call it.
    /// Returns true for the call that actually did the work.
    pub fn cleanup(&self) -> bool {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cancel();
        self.kill_helper();
        info!("session cleanup complete");
        true
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    fn helper_slot(&self) -> MutexGuard<'_, Option<Child>> {
        // A panic while holding the slot cannot leave the Option half-updated
        self.helper.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn kill_child(mut child: Child) {
    let pid = child.id();
    if let Err(e) = child.kill() {
        // Already exited is fine
        debug!(pid, error = %e, "helper kill returned an error");
    }
    match child.wait() {
        Ok(status) => debug!(pid, %status, "helper process stopped"),
        Err(e) => warn!(pid, error = %e, "failed to reap helper process"),
    }
}
