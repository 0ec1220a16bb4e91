use std::path::PathBuf;

use anyhow::Context;
use shimguard_core::app::{Launch, Launcher};
use shimguard_core::gate::ConfirmPrompt;
use shimguard_core::install::{self, DirectoryPayload};
use shimguard_core::settings::Settings;
use shimguard_core::supervisor::FaultReporter;

use crate::commands::session::{load_selection, print_outcome, print_progress};
use crate::terminal::TerminalDialog;

#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Catalog file listing the targets
    pub catalog: PathBuf,
    /// Name of the target inside the catalog
    pub target: String,
    /// Directory holding the replacement files
    pub payload: PathBuf,
}

/// Install interactively on the terminal.
pub fn run(settings: &Settings, request: &InstallRequest) -> anyhow::Result<Launch> {
    run_with(
        Launcher::new(settings),
        request,
        TerminalDialog::stdio,
        &mut TerminalDialog::stdio(),
    )
}

/// Install with caller-supplied dialogs. `make_prompt` is called once per
/// session attempt.
pub fn run_with<P, M, R>(
    launcher: Launcher<'_>,
    request: &InstallRequest,
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
                let selection = load_selection(&request.catalog, &request.target)?;
                let payload = DirectoryPayload::new(&request.payload);
                let mut prompt = make_prompt();
                let outcome =
                    install::install(ctx, &selection, &payload, &mut prompt, Some(print_progress))?;
                print_outcome(&selection.name, "installed", outcome);
                Ok(())
            },
            reporter,
        )
        .context("failed to start install session")
}
