/*
 * This file is part of Fancontrol-GUI.
 *
 * Copyright (C) 2025 Fancontrol-GUI contributors
 *
 * Fancontrol-GUI is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Fancontrol-GUI is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Fancontrol-GUI. If not, see <https://www.gnu.org/licenses/>.
 */

//! Application settings (not the fancontrol config itself).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{document, env as env_vars, paths, timing};
use crate::error::{FancontrolError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// fancontrol config file to edit
    pub config_path: PathBuf,
    /// hwmon class directory
    pub hwmon_path: PathBuf,
    /// Live reading refresh period
    pub refresh_ms: u64,
    /// Program run through pkexec when the config is not accessible
    pub helper_program: PathBuf,
    pub helper_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(paths::FANCONTROL_CONFIG),
            hwmon_path: PathBuf::from(paths::HWMON_BASE),
            refresh_ms: timing::REFRESH_PERIOD_MS,
            helper_program: PathBuf::from(paths::HELPER_PROGRAM),
            helper_timeout_secs: timing::HELPER_TIMEOUT_SECS,
        }
    }
}

/// `$XDG_CONFIG_HOME/fancontrol-gui/settings.json`, else below
/// `$HOME/.config`, else the system wide file
pub fn settings_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join(paths::APP_DIR).join(paths::SETTINGS_FILE);
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join(paths::APP_DIR)
            .join(paths::SETTINGS_FILE);
    }
    PathBuf::from(paths::SYSTEM_SETTINGS)
}

impl AppSettings {
    /// Settings from the default location with environment overrides applied
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&settings_path())?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(FancontrolError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if size > document::MAX_CONFIG_SIZE as u64 {
            return Err(FancontrolError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                max_size: document::MAX_CONFIG_SIZE as u64,
            });
        }

        let data = fs::read_to_string(path).map_err(|source| FancontrolError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Write the settings as pretty JSON, creating the directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| FancontrolError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `FANCONTROL_CONFIG` and `FANCONTROL_HWMON_PATH` win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Some(p) = env::var_os(env_vars::CONFIG) {
            self.config_path = PathBuf::from(p);
        }
        if let Some(p) = env::var_os(env_vars::HWMON_PATH) {
            self.hwmon_path = PathBuf::from(p);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_ms == 0 {
            return Err(FancontrolError::config("refresh_ms must be positive"));
        }
        if self.helper_timeout_secs == 0 {
            return Err(FancontrolError::config("helper_timeout_secs must be positive"));
        }
        for (name, path) in [
            ("config_path", &self.config_path),
            ("hwmon_path", &self.hwmon_path),
            ("helper_program", &self.helper_program),
        ] {
            if !path.is_absolute() {
                return Err(FancontrolError::config(format!(
                    "{} must be an absolute path, got {}",
                    name,
                    path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn helper_timeout(&self) -> Duration {
        Duration::from_secs(self.helper_timeout_secs)
    }
}
