use std::path::PathBuf;

use anyhow::Context;
use shimguard_core::app::{Launch, Launcher};
use shimguard_core::gate::ConfirmPrompt;
use shimguard_core::install;
use shimguard_core::settings::Settings;
use shimguard_core::supervisor::FaultReporter;

use crate::commands::session::{load_selection, print_outcome, print_progress};
use crate::terminal::TerminalDialog;

#[derive(Debug, Clone)]
pub enum UninstallRequest {
    /// Restore the files of one catalog target
    Target { catalog: PathBuf, target: String },
    /// Restore every backup found under a directory
    Root(PathBuf),
}

/// Uninstall interactively on the terminal.
pub fn run(settings: &Settings, request: &UninstallRequest) -> anyhow::Result<Launch> {
    run_with(
        Launcher::new(settings),
        request,
        TerminalDialog::stdio,
        &mut TerminalDialog::stdio(),
    )
}

pub fn run_with<P, M, R>(
    launcher: Launcher<'_>,
    request: &UninstallRequest,
    mut make_prompt: M,
    reporter: &mut R,
) -> anyhow::Result<Launch>
where
    P: ConfirmPrompt,
    M: FnMut() -> P,
    R: FaultReporter + ?Sized,
{
    launcher
        .run(
            |ctx| {
                let mut prompt = make_prompt();
                match request {
                    UninstallRequest::Target { catalog, target } => {
                        let selection = load_selection(catalog, target)?;
                        let outcome =
                            install::uninstall(ctx, &selection, &mut prompt, Some(print_progress))?;
                        print_outcome(&selection.name, "restored", outcome);
                    }
                    UninstallRequest::Root(root) => {
                        let outcome = install::uninstall_orphans(
                            ctx,
                            root,
                            &mut prompt,
                            Some(print_progress),
                        )?;
                        print_outcome(&root.display().to_string(), "restored", outcome);
                    }
                }
                Ok(())
            },
            reporter,
        )
        .context("failed to start uninstall session")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shimguard_core::backup;
    use shimguard_core::gate::{LockPrompt, PromptChoice};
    use shimguard_core::supervisor::{FaultChoice, SessionFault};
    use std::fs;
    use tempfile::tempdir;

    fn cancel(_: &LockPrompt) -> PromptChoice {
        PromptChoice::Cancel
    }

    #[test]
    fn root_sweep_restores_backups() {
        let game = tempdir().unwrap();
        let locks = tempdir().unwrap();
        let dll = game.path().join("steam_api.dll");
        fs::write(&dll, b"original").unwrap();
        backup::backup(&dll).unwrap();
        fs::write(&dll, b"shim").unwrap();

        let settings = Settings::default();
        let launch = run_with(
            Launcher::new(&settings)
                .without_signal_handler()
                .with_lock_dir(locks.path()),
            &UninstallRequest::Root(game.path().to_path_buf()),
            || cancel,
            &mut |_: &SessionFault| FaultChoice::Accept,
        )
        .unwrap();

        assert!(matches!(launch, Launch::Finished(ref o) if o.completed));
        assert_eq!(fs::read(&dll).unwrap(), b"original");
        assert!(!backup::has_backup(&dll));
    }
}
