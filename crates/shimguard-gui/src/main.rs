//! # shimguard-gui
//!
//! Desktop entry point. Runs the same supervised session as the terminal
//! front end, but every question is a native message box:
//!
//! - "target is running" asks Retry / Cancel
//! - an unexpected fault asks Retry / Exit
//!
//! Paths not given on the command line are picked with file dialogs. A second
//! copy started while one is running exits immediately without a window.

mod dialogs;

use clap::{Parser, Subcommand};
use shimguard_core::app::{Launch, Launcher};
use shimguard_core::gate::PromptIcon;
use shimguard_core::install::{self, BatchOutcome, DirectoryPayload, Progress};
use shimguard_core::logging;
use shimguard_core::selection::{TargetCatalog, TargetSelection};
use shimguard_core::settings::Settings;
use shimguard_core::supervisor::SessionFault;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::dialogs::{show_message, DesktopDialog};

#[derive(Parser, Debug)]
#[command(name = "shimguard-gui")]
#[command(about = "Desktop shim installer")]
struct Args {
    /// Catalog file listing the targets (asked for when omitted)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Target name inside the catalog (first target when omitted)
    #[arg(long, global = true)]
    target: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install replacement files (default)
    Install {
        /// Directory containing the replacement files (asked for when omitted)
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Restore original files from their backups
    Uninstall,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Settings::load_default()?;
    logging::init_logging(settings.log_format, "info");

    let command = args.command.unwrap_or(Command::Install { payload: None });
    let mut reporter = DesktopDialog;
    let launch = Launcher::new(&settings).run(
        |ctx| {
            // Everything is rebuilt on each attempt, including the file picks
            let catalog = pick_catalog(args.catalog.as_ref())?;
            let selection = select_target(&catalog, args.target.as_deref())?;
            let mut prompt = DesktopDialog;

            let (icon, message) = match &command {
                Command::Install { payload } => {
                    let payload = DirectoryPayload::new(pick_payload(payload.as_ref())?);
                    let outcome =
                        install::install(ctx, &selection, &payload, &mut prompt, Some(log_progress))?;
                    outcome_message(&selection.name, "installed", outcome)
                }
                Command::Uninstall => {
                    let outcome =
                        install::uninstall(ctx, &selection, &mut prompt, Some(log_progress))?;
                    outcome_message(&selection.name, "restored", outcome)
                }
            };
            show_message(icon, &message);
            Ok(())
        },
        &mut reporter,
    )?;

    match launch {
        Launch::SecondInstance => {}
        Launch::Finished(outcome) => {
            info!(completed = outcome.completed, attempts = outcome.attempts, "session finished");
        }
    }
    Ok(())
}

fn pick_catalog(given: Option<&PathBuf>) -> Result<PathBuf, SessionFault> {
    if let Some(path) = given {
        return Ok(path.clone());
    }
    rfd::FileDialog::new()
        .set_title("Select target catalog")
        .add_filter("Catalog", &["json"])
        .pick_file()
        .ok_or_else(|| SessionFault::Message("no catalog selected".to_string()))
}

fn pick_payload(given: Option<&PathBuf>) -> Result<PathBuf, SessionFault> {
    if let Some(path) = given {
        return Ok(path.clone());
    }
    rfd::FileDialog::new()
        .set_title("Select folder with replacement files")
        .pick_folder()
        .ok_or_else(|| SessionFault::Message("no payload folder selected".to_string()))
}

fn select_target(catalog: &Path, name: Option<&str>) -> Result<TargetSelection, SessionFault> {
    let catalog = TargetCatalog::load(catalog)?;
    let found = match name {
        Some(name) => catalog.find(name),
        None => catalog.targets.first(),
    };
    found
        .cloned()
        .ok_or_else(|| SessionFault::Message("target not found in catalog".to_string()))
}

fn log_progress(p: Progress<'_>) {
    info!(action = %p.action, index = p.index + 1, total = p.total, file = %p.file.display());
}

fn outcome_message(name: &str, verb: &str, outcome: BatchOutcome) -> (PromptIcon, String) {
    match outcome {
        BatchOutcome::Completed { files_changed } => (
            PromptIcon::Information,
            format!("{}: {} {} file(s).", name, verb, files_changed),
        ),
        BatchOutcome::Aborted => (
            PromptIcon::Warning,
            format!("{}: canceled, no files were changed.", name),
        ),
    }
}
