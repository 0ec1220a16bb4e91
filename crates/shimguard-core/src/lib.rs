//! # shimguard-core
//!
//! The safe-mutation subsystem behind the shimguard installer:
//!
//! - [`probe`]: is a file currently held open by another process?
//! - [`backup`]: sibling backups (`<file>.shimguard.backup`) created before a
//!   mutation and restored on rollback or uninstall
//! - [`gate`]: blocks mutation while a target's files are in use
//! - [`instance`]: one installer process per machine
//! - [`supervisor`]: fault boundary around the interactive session
//! - [`install`]: the mutation batches that tie the pieces together
//! - [`app`]: process startup shared by the front ends

pub mod app;
pub mod backup;
mod error;
pub mod gate;
pub mod install;
pub mod instance;
pub mod logging;
pub mod probe;
pub mod selection;
pub mod session;
pub mod settings;
pub mod supervisor;
pub mod utils;

pub use error::{Error, Result};

/// Human-readable application identity, used as dialog title.
pub const APP_NAME: &str = concat!("shimguard v", env!("CARGO_PKG_VERSION"));
