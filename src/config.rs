//! User defaults stored in `~/.screenshot-defaults.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{defaults, limits};
use crate::output;
use crate::settings::CaptureSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDefaults {
    pub delay_seconds: u32,
    pub hide_window: bool,
    pub format: String,
    pub save_directory: Option<PathBuf>,
}

impl Default for UserDefaults {
    fn default() -> Self {
        Self {
            delay_seconds: defaults::DELAY_SECONDS,
            hide_window: false,
            format: defaults::FORMAT.to_string(),
            save_directory: None,
        }
    }
}

impl UserDefaults {
    /// Fix values a hand-edited file may get wrong.
    fn sanitize(mut self) -> Self {
        if self.delay_seconds > limits::MAX_DELAY_SECONDS {
            log::warn!(
                "Delay of {}s in defaults file exceeds {}s, clamping",
                self.delay_seconds,
                limits::MAX_DELAY_SECONDS
            );
            self.delay_seconds = limits::MAX_DELAY_SECONDS;
        }
        if self.delay_seconds == 0 && self.hide_window {
            log::warn!("Ignoring hide_window in defaults file because the delay is 0");
            self.hide_window = false;
        }
        if output::parse_format(&self.format).is_err() {
            log::warn!(
                "Unsupported format '{}' in defaults file, using {}",
                self.format,
                defaults::FORMAT
            );
            self.format = defaults::FORMAT.to_string();
        }
        self
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        let sanitized = self.clone().sanitize();
        CaptureSettings::new(sanitized.delay_seconds, sanitized.hide_window).unwrap_or_default()
    }

    /// Where screenshots go when no path is given: the configured directory,
    /// then the user's Pictures folder, then the current directory.
    pub fn save_directory(&self) -> PathBuf {
        self.save_directory
            .clone()
            .or_else(dirs::picture_dir)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn get_defaults_file_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(defaults::DEFAULTS_FILE_NAME))
}

pub fn load_defaults_from(path: &Path) -> Result<UserDefaults> {
    if !path.exists() {
        return Ok(UserDefaults::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let loaded = serde_json::from_str::<UserDefaults>(&content).unwrap_or_else(|e| {
        log::warn!(
            "Ignoring malformed defaults file {}: {}",
            path.display(),
            e
        );
        UserDefaults::default()
    });

    Ok(loaded.sanitize())
}

pub fn save_defaults_to(path: &Path, user_defaults: &UserDefaults) -> Result<()> {
    let content = serde_json::to_string_pretty(user_defaults)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Saved defaults to {}", path.display());
    Ok(())
}

pub fn load_defaults() -> Result<UserDefaults> {
    load_defaults_from(&get_defaults_file_path()?)
}

pub fn save_defaults(user_defaults: &UserDefaults) -> Result<()> {
    save_defaults_to(&get_defaults_file_path()?, user_defaults)
}
