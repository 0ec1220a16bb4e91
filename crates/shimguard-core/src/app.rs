//! Process-level startup shared by the terminal and desktop front ends.
//!
//! Single-instance check first, then the supervised session. The instance
//! lock is held until [`Launcher::run`] returns.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::instance::InstanceGuard;
use crate::session::SessionContext;
use crate::settings::Settings;
use crate::supervisor::{self, FaultReporter, SessionFault, Supervisor, SupervisorOutcome};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Another copy is running; nothing was done
    SecondInstance,
    Finished(SupervisorOutcome),
}

pub struct Launcher<'a> {
    settings: &'a Settings,
    handle_signals: bool,
    lock_dir: Option<PathBuf>,
}

impl<'a> Launcher<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Launcher {
            settings,
            handle_signals: true,
            lock_dir: None,
        }
    }

    /// Take the instance lock in `dir` instead of the per-user location.
    ///
    /// Lets tests run isolated launchers side by side. Neither settings nor
    /// command-line flags reach this.
    #[doc(hidden)]
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    /// Skip installing the process-wide termination handler.
    pub fn without_signal_handler(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    pub fn run<S, R>(&self, mut session: S, reporter: &mut R) -> Result<Launch>
    where
        S: FnMut(&SessionContext) -> std::result::Result<(), SessionFault>,
        R: FaultReporter + ?Sized,
    {
        let acquired = match &self.lock_dir {
            Some(dir) => InstanceGuard::acquire_in(dir),
            None => InstanceGuard::acquire(),
        };
        let _guard = match acquired {
            Ok(guard) => guard,
            Err(Error::SecondInstance) => {
                info!("already running, exiting");
                return Ok(Launch::SecondInstance);
            }
            Err(e) => return Err(e),
        };

        let ctx = SessionContext::new();
        if self.handle_signals {
            supervisor::install_termination_handler(Arc::clone(&ctx))?;
        }

        let helper = self.settings.helper.clone();
        let mut supervisor = Supervisor::new(ctx);
        let outcome = supervisor.run(
            |ctx| {
                if let Some(helper) = &helper {
                    ctx.spawn_helper(helper)?;
                }
                session(ctx)
            },
            reporter,
        );

        if !outcome.completed {
            warn!(attempts = outcome.attempts, "session ended after a fault");
        }
        Ok(Launch::Finished(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceGuard;
    use crate::logging::LogFormat;
    use crate::supervisor::FaultChoice;
    use tempfile::tempdir;

    fn launcher_in<'a>(settings: &'a Settings, dir: &std::path::Path) -> Launcher<'a> {
        Launcher::new(settings)
            .without_signal_handler()
            .with_lock_dir(dir)
    }

    fn accept(_: &SessionFault) -> FaultChoice {
        FaultChoice::Accept
    }

    #[test]
    fn second_instance_skips_session() {
        let dir = tempdir().unwrap();
        let _running = InstanceGuard::acquire_in(dir.path()).unwrap();
        let settings = Settings::default();

        let mut ran = false;
        let launch = launcher_in(&settings, dir.path())
            .run(
                |_| {
                    ran = true;
                    Ok(())
                },
                &mut accept,
            )
            .unwrap();

        assert_eq!(launch, Launch::SecondInstance);
        assert!(!ran);
    }

    #[test]
    fn different_settings_share_one_lock() {
        let dir = tempdir().unwrap();
        let outer_settings = Settings::default();
        let inner_settings = Settings {
            log_format: LogFormat::Json,
            ..Settings::default()
        };

        let mut inner_ran = false;
        let mut inner_launch = None;
        let outer = launcher_in(&outer_settings, dir.path())
            .run(
                |_| {
                    let launch = launcher_in(&inner_settings, dir.path())
                        .run(
                            |_| {
                                inner_ran = true;
                                Ok(())
                            },
                            &mut accept,
                        )
                        .map_err(SessionFault::from)?;
                    inner_launch = Some(launch);
                    Ok(())
                },
                &mut accept,
            )
            .unwrap();

        assert!(matches!(outer, Launch::Finished(SupervisorOutcome { completed: true, .. })));
        assert_eq!(inner_launch, Some(Launch::SecondInstance));
        assert!(!inner_ran);
    }

    #[test]
    fn lock_released_after_run() {
        let dir = tempdir().unwrap();
        let settings = Settings::default();

        let launch = launcher_in(&settings, dir.path())
            .run(|_| Ok(()), &mut accept)
            .unwrap();

        assert!(matches!(launch, Launch::Finished(SupervisorOutcome { completed: true, .. })));
        assert!(InstanceGuard::acquire_in(dir.path()).is_ok());
    }

    #[test]
    fn lock_held_during_session() {
        let dir = tempdir().unwrap();
        let settings = Settings::default();

        let launch = launcher_in(&settings, dir.path())
            .run(
                |_| match InstanceGuard::acquire_in(dir.path()) {
                    Err(Error::SecondInstance) => Ok(()),
                    _ => Err(SessionFault::Message("lock not held".to_string())),
                },
                &mut accept,
            )
            .unwrap();

        assert!(matches!(launch, Launch::Finished(SupervisorOutcome { completed: true, .. })));
    }
}
