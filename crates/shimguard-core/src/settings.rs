use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::logging::LogFormat;
use crate::session::HelperCommand;
use crate::Result;

/// Filename for the user settings, inside the shimguard config directory
pub const SETTINGS_FILENAME: &str = "settings.json";

/// User settings. Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_format: LogFormat,
    /// Auxiliary process started with each session and killed on cleanup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper: Option<HelperCommand>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Settings> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load from the default location, see [`default_path`].
    pub fn load_default() -> Result<Settings> {
        match default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Settings::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// `<config dir>/shimguard/settings.json`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shimguard").join(SETTINGS_FILENAME))
}
