//! Top-level fault boundary around the interactive session.
//!
//! ```text
//!            fault / panic            Accept
//! Running ─────────────────► Faulted ───────► Terminated
//!    ▲                          │                 ▲
//!    └────────── Retry ─────────┘                 │
//!    └──────────── normal completion ─────────────┘
//! ```
//!
//! Every attempt rebuilds the session from scratch. Cleanup runs exactly once
//! on the way into `Terminated`, including when the OS asks the process to
//! stop (see [`install_termination_handler`]).

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::session::SessionContext;
use crate::{Error, Result};

/// Exit status used when the process is stopped by a signal.
pub const SIGNAL_EXIT_CODE: i32 = 130;

/// An unhandled condition raised by a session attempt.
#[derive(Error, Debug)]
pub enum SessionFault {
    #[error(transparent)]
    Core(#[from] Error),
    #[error("session panicked: {0}")]
    Panic(String),
    #[error("{0}")]
    Message(String),
}

impl From<io::Error> for SessionFault {
    fn from(e: io::Error) -> Self {
        SessionFault::Core(Error::Io(e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultChoice {
    Retry,
    Accept,
}

/// Blocking UI callback that shows a fault and asks whether to retry.
pub trait FaultReporter {
    fn report(&mut self, fault: &SessionFault) -> FaultChoice;
}

impl<F> FaultReporter for F
where
    F: FnMut(&SessionFault) -> FaultChoice,
{
    fn report(&mut self, fault: &SessionFault) -> FaultChoice {
        self(fault)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    Faulted,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorOutcome {
    /// True when the last attempt finished without a fault
    pub completed: bool,
    pub attempts: usize,
    pub last_fault: Option<String>,
}

pub struct Supervisor {
    ctx: Arc<SessionContext>,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(ctx: Arc<SessionContext>) -> Self {
        Supervisor {
            ctx,
            state: SupervisorState::Running,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Run `session` until it completes or the user accepts a fault.
    pub fn run<S, R>(&mut self, mut session: S, reporter: &mut R) -> SupervisorOutcome
    where
        S: FnMut(&SessionContext) -> std::result::Result<(), SessionFault>,
        R: FaultReporter + ?Sized,
    {
        let mut attempts = 0;
        let mut last_fault = None;
        let completed = loop {
            if attempts > 0 {
                self.ctx.reset_for_retry();
            }
            attempts += 1;
            self.state = SupervisorState::Running;

            let ctx: &SessionContext = &self.ctx;
            let result = panic::catch_unwind(AssertUnwindSafe(|| session(ctx)));
            let fault = match result {
                Ok(Ok(())) => break true,
                Ok(Err(fault)) => fault,
                Err(payload) => SessionFault::Panic(panic_message(payload.as_ref())),
            };

            self.state = SupervisorState::Faulted;
            error!(attempt = attempts, error = %fault, "session faulted");
            let choice = reporter.report(&fault);
            last_fault = Some(fault.to_string());

            match choice {
                FaultChoice::Retry => {
                    info!(attempt = attempts, "retrying session");
                }
                FaultChoice::Accept => break false,
            }
        };

        self.terminate();
        SupervisorOutcome {
            completed,
            attempts,
            last_fault: if completed { None } else { last_fault },
        }
    }

    fn terminate(&mut self) {
        self.state = SupervisorState::Terminated;
        if !self.ctx.cleanup() {
            warn!("cleanup already performed by another exit path");
        }
    }
}

/// Run the session cleanup and exit when the OS asks the process to stop
/// (Ctrl+C, SIGTERM, console close).
///
/// Can only be installed once per process. Exiting here skips destructors, so
/// a copy in flight leaves its `.shimguard-*` staging file behind;
/// [`crate::install::uninstall_orphans`] removes those.
pub fn install_termination_handler(ctx: Arc<SessionContext>) -> Result<()> {
    ctrlc::set_handler(move || {
        warn!("termination requested");
        ctx.cleanup();
        std::process::exit(SIGNAL_EXIT_CODE);
    })
    .map_err(|e| Error::Io(io::Error::other(format!("failed to install signal handler: {e}"))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
