use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use shimguard::commands::install::InstallRequest;
use shimguard::commands::lock;
use shimguard::commands::uninstall::UninstallRequest;
use shimguard_core::app::Launch;
use shimguard_core::instance::InstanceGuard;
use shimguard_core::logging::{self, LogFormat};
use shimguard_core::settings::{self, Settings};

#[derive(Parser)]
#[command(name = "shimguard")]
#[command(about = "Safely patch application shim libraries")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log output format, overrides the settings file
    #[arg(long, global = true, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether files are in use and whether they have a backup
    Probe {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Single-file backup operations
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Install replacement files into a target, backing up the originals
    Install {
        /// Catalog file listing the targets
        #[arg(long)]
        catalog: PathBuf,
        /// Target name inside the catalog
        #[arg(long)]
        target: String,
        /// Directory containing the replacement files
        #[arg(long)]
        payload: PathBuf,
    },
    /// Restore original files from their backups
    Uninstall {
        /// Catalog file listing the targets
        #[arg(long, requires = "target", conflicts_with = "root")]
        catalog: Option<PathBuf>,
        /// Target name inside the catalog
        #[arg(long, requires = "catalog")]
        target: Option<String>,
        /// Restore every backup found under this directory instead
        #[arg(long, required_unless_present = "catalog")]
        root: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Back up a file next to itself
    Create {
        /// File to back up
        file: PathBuf,
    },
    /// Restore a file from its backup and remove the backup
    Restore {
        /// File to restore
        file: PathBuf,
    },
    /// List files that have a backup under a directory
    List {
        /// Directory to scan
        root: PathBuf,
    },
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    match value {
        "human" => Ok(LogFormat::Human),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format '{}' (expected human or json)", other)),
    }
}

fn load_settings(path: Option<&PathBuf>) -> Settings {
    let loaded = match path {
        Some(path) => Settings::load(path),
        None => Settings::load_default(),
    };
    match loaded {
        Ok(settings) => settings,
        Err(e) => {
            let shown = path.cloned().or_else(settings::default_path);
            eprintln!(
                "Error: failed to read settings {}: {}",
                shown.map(|p| p.display().to_string()).unwrap_or_default(),
                e
            );
            process::exit(2);
        }
    }
}

fn finish(result: anyhow::Result<Launch>) {
    match result {
        // Another instance owns the session; leave silently
        Ok(Launch::SecondInstance) => {}
        Ok(Launch::Finished(outcome)) => {
            if !outcome.completed {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.settings.as_ref());
    if let Some(format) = cli.log_format {
        settings.log_format = format;
    }
    logging::init_logging(settings.log_format, "warn");

    match cli.command {
        Commands::Probe { files } => {
            let mut any_locked = false;
            for status in shimguard::commands::probe::run(&files) {
                any_locked |= status.locked;
                println!(
                    "{}: {}{}{}",
                    status.path.display(),
                    if status.locked { "in use" } else { "not in use" },
                    if status.exists { "" } else { ", missing" },
                    if status.backed_up { ", backed up" } else { "" },
                );
            }
            if any_locked {
                process::exit(1);
            }
        }
        Commands::Backup { command } => match command {
            BackupCommands::Create { file } => {
                let created = lock::exclusive(InstanceGuard::acquire(), |owner| {
                    shimguard::commands::backup_create::run(owner, &file)
                });
                match created {
                    Ok(Some(record)) => {
                        println!("Backup written to {}", record.display());
                    }
                    // Another instance owns the files; leave silently
                    Ok(None) => {}
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(2);
                    }
                }
            }
            BackupCommands::Restore { file } => {
                let restored = lock::exclusive(InstanceGuard::acquire(), |owner| {
                    shimguard::commands::backup_restore::run(owner, &file)
                });
                match restored {
                    Ok(Some(())) => {
                        println!("Restored {}", file.display());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(2);
                    }
                }
            }
            BackupCommands::List { root } => match shimguard::commands::backup_list::run(&root) {
                Ok(found) => {
                    for original in &found {
                        println!("{}", original.display());
                    }
                    println!("{} backup(s) found", found.len());
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(2);
                }
            },
        },
        Commands::Install {
            catalog,
            target,
            payload,
        } => {
            let request = InstallRequest {
                catalog,
                target,
                payload,
            };
            finish(shimguard::commands::install::run(&settings, &request));
        }
        Commands::Uninstall {
            catalog,
            target,
            root,
        } => {
            let request = match (catalog, target, root) {
                (Some(catalog), Some(target), _) => UninstallRequest::Target { catalog, target },
                (_, _, Some(root)) => UninstallRequest::Root(root),
                // clap enforces one of the two forms
                _ => unreachable!("uninstall needs --catalog/--target or --root"),
            };
            finish(shimguard::commands::uninstall::run(&settings, &request));
        }
    }
}
