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

//! The fancontrol config document.
//!
//! [`ConfigDocument`] owns the sensor registry together with the global
//! interval, the file location, the config text and the error status.
//! Failures never escape as `Err`: they land in [`ConfigDocument::error`],
//! which reads `"Success"` after every operation that worked.
//!
//! Changes are reported to listeners as [`DocumentEvent`]s. Events are
//! collected while an operation runs and delivered once it is done.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::constants::document::{DEFAULT_INTERVAL, MAX_CONFIG_SIZE, STATUS_SUCCESS};
use crate::error::{FancontrolError, Result};
use crate::fantest::{test_fan, FanTestReport, FanTestSettings, SysfsPwm};
use crate::helper::{read_with_fallback, write_with_fallback, PkexecHelper, PrivilegedHelper};
use crate::hwmon::SensorRegistry;
use crate::ident::ChannelId;
use crate::parser::{parse, ConfigEdits};
use crate::sensors::PwmFan;
use crate::serializer::serialize;
use crate::settings::AppSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    IntervalChanged,
    LocationChanged,
    ConfigTextChanged,
    ErrorChanged,
    /// Hardware was enumerated again; old handles are stale
    HwmonsChanged,
    FanChanged(ChannelId),
    SensorsUpdated,
}

/// Reference to a fan that remembers the hardware generation it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanHandle {
    pub id: ChannelId,
    generation: u64,
}

impl FanHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

type Listener = Box<dyn FnMut(&DocumentEvent) + Send>;

pub struct ConfigDocument {
    registry: SensorRegistry,
    helper: Box<dyn PrivilegedHelper>,
    interval: u32,
    location: Option<PathBuf>,
    config_text: String,
    error: String,
    listeners: Vec<Listener>,
    pending: Vec<DocumentEvent>,
}

impl ConfigDocument {
    pub fn new(registry: SensorRegistry, helper: Box<dyn PrivilegedHelper>) -> Self {
        let config_text = serialize(DEFAULT_INTERVAL, &registry);
        Self {
            registry,
            helper,
            interval: DEFAULT_INTERVAL,
            location: None,
            config_text,
            error: STATUS_SUCCESS.to_string(),
            listeners: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Discover hardware under the configured root and load the configured file
    pub fn open(settings: &AppSettings) -> Self {
        let registry = SensorRegistry::discover_at(&settings.hwmon_path);
        let helper = PkexecHelper::new(&settings.helper_program, settings.helper_timeout());
        let mut doc = Self::new(registry, Box::new(helper));
        doc.load(&settings.config_path);
        doc
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DocumentEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Text as loaded, or as regenerated after the last edit
    pub fn config_text(&self) -> &str {
        &self.config_text
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn generation(&self) -> u64 {
        self.registry.generation()
    }

    /// Read and apply the config at `path`.
    ///
    /// A missing file counts as an empty config. Returns whether the load
    /// succeeded; the reason for a failure is in [`error`](Self::error).
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        let ok = self.load_inner(path.as_ref());
        self.flush();
        ok
    }

    fn load_inner(&mut self, path: &Path) -> bool {
        info!(path = %path.display(), "Loading fancontrol config");

        let text = match read_with_fallback(path, read_limited, self.helper.as_ref()) {
            Ok(text) => text,
            Err(message) => {
                warn!(path = %path.display(), error = %message, "Config load failed");
                self.set_error(message);
                return false;
            }
        };
        if text.is_none() {
            debug!(path = %path.display(), "Config file does not exist, starting empty");
        }

        let edits = match parse(text.as_deref().unwrap_or_default()) {
            Ok(edits) => edits,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config rejected");
                self.set_error(e.to_string());
                return false;
            }
        };

        self.set_location(path);
        self.apply(&edits);
        match text {
            Some(text) => self.set_config_text(text),
            None => self.regenerate(),
        }
        self.set_error(STATUS_SUCCESS);
        true
    }

    /// Write the canonical text to `path`, or to the current location.
    ///
    /// Saving elsewhere does not move the document's location.
    pub fn save(&mut self, path: Option<&Path>) -> bool {
        let ok = self.save_inner(path);
        self.flush();
        ok
    }

    fn save_inner(&mut self, path: Option<&Path>) -> bool {
        let Some(target) = path.map(Path::to_path_buf).or_else(|| self.location.clone()) else {
            self.set_error("No config location to save to");
            return false;
        };

        self.regenerate();
        info!(path = %target.display(), "Saving fancontrol config");
        match write_with_fallback(
            &target,
            &self.config_text,
            |p, content| fs::write(p, content),
            self.helper.as_ref(),
        ) {
            Ok(()) => {
                self.set_error(STATUS_SUCCESS);
                true
            }
            Err(message) => {
                warn!(path = %target.display(), error = %message, "Config save failed");
                self.set_error(message);
                false
            }
        }
    }

    pub fn set_interval(&mut self, interval: u32) -> bool {
        let changed = self.interval != interval;
        if changed {
            self.interval = interval;
            self.emit(DocumentEvent::IntervalChanged);
            self.regenerate();
        }
        self.flush();
        changed
    }

    /// Handle for the fan `id` of the current hardware generation
    pub fn fan_handle(&self, id: ChannelId) -> Result<FanHandle> {
        if self.registry.pwm_fan(id).is_none() {
            return Err(FancontrolError::UnknownChannel(id.pwm_ident()));
        }
        Ok(FanHandle {
            id,
            generation: self.registry.generation(),
        })
    }

    pub fn fan(&self, handle: FanHandle) -> Result<&PwmFan> {
        self.check_generation(handle)?;
        self.registry
            .pwm_fan(handle.id)
            .ok_or_else(|| FancontrolError::UnknownChannel(handle.id.pwm_ident()))
    }

    /// Change one fan through its setters.
    ///
    /// `edit` returns whether it changed anything, which is what the setters
    /// report. A change regenerates the config text.
    pub fn edit_fan<F>(&mut self, handle: FanHandle, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut PwmFan) -> bool,
    {
        self.check_generation(handle)?;
        let fan = self
            .registry
            .pwm_fan_mut(handle.id)
            .ok_or_else(|| FancontrolError::UnknownChannel(handle.id.pwm_ident()))?;

        let changed = edit(fan);
        if changed {
            debug!(fan = %handle.id, "Fan edited");
            self.emit(DocumentEvent::FanChanged(handle.id));
            self.regenerate();
        }
        self.flush();
        Ok(changed)
    }

    /// Re-sample every live reading
    pub fn refresh(&mut self) -> usize {
        let sampled = self.registry.refresh();
        self.emit(DocumentEvent::SensorsUpdated);
        self.flush();
        sampled
    }

    /// Run the stop/start test on every PWM channel and keep the results.
    ///
    /// Blocks until every fan has been ramped. Measured values become the
    /// fan's `minStop` and `minStart`; a fan whose test fails keeps its
    /// settings.
    pub fn test_fans(&mut self, settings: &FanTestSettings) -> Vec<FanTestReport> {
        let channels: Vec<(ChannelId, PathBuf)> = self
            .registry
            .chips()
            .iter()
            .flat_map(|chip| chip.pwm_fans.iter().map(move |f| (f.id, chip.path.clone())))
            .collect();

        let mut reports = Vec::with_capacity(channels.len());
        let mut any_changed = false;
        for (id, dir) in channels {
            let mut control = SysfsPwm::new(dir, id.channel);
            let result = test_fan(id, &mut control, settings).map_err(|e| e.to_string());
            let changed = match (&result, self.registry.pwm_fan_mut(id)) {
                (Ok(calibration), Some(fan)) => {
                    fan.set_min_stop(calibration.min_stop) | fan.set_min_start(calibration.min_start)
                }
                _ => false,
            };
            if let Err(message) = &result {
                warn!(fan = %id, error = %message, "Fan test failed");
            }
            if changed {
                self.emit(DocumentEvent::FanChanged(id));
                any_changed = true;
            }
            reports.push(FanTestReport { id, result });
        }

        if any_changed {
            self.regenerate();
        }
        self.registry.refresh();
        self.emit(DocumentEvent::SensorsUpdated);
        self.flush();
        reports
    }

    /// Enumerate hardware again and re-apply the current config text to it
    pub fn rescan(&mut self) -> u64 {
        let generation = self.registry.rediscover();
        self.emit(DocumentEvent::HwmonsChanged);
        match parse(&self.config_text) {
            Ok(edits) => {
                let report = edits.apply_to(&mut self.registry);
                for id in report.changed {
                    self.emit(DocumentEvent::FanChanged(id));
                }
            }
            Err(e) => self.set_error(e.to_string()),
        }
        self.flush();
        generation
    }

    fn check_generation(&self, handle: FanHandle) -> Result<()> {
        let current = self.registry.generation();
        if handle.generation != current {
            return Err(FancontrolError::StaleHandle {
                held: handle.generation,
                current,
            });
        }
        Ok(())
    }

    fn apply(&mut self, edits: &ConfigEdits) {
        let report = edits.apply_to(&mut self.registry);
        for id in report.changed {
            self.emit(DocumentEvent::FanChanged(id));
        }
        if let Some(interval) = edits.interval() {
            if interval != self.interval {
                self.interval = interval;
                self.emit(DocumentEvent::IntervalChanged);
            }
        }
    }

    fn regenerate(&mut self) {
        let text = serialize(self.interval, &self.registry);
        self.set_config_text(text);
    }

    fn set_config_text(&mut self, text: String) {
        if self.config_text != text {
            self.config_text = text;
            self.emit(DocumentEvent::ConfigTextChanged);
        }
    }

    fn set_location(&mut self, path: &Path) {
        if self.location.as_deref() != Some(path) {
            self.location = Some(path.to_path_buf());
            self.emit(DocumentEvent::LocationChanged);
        }
    }

    fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.error != message {
            self.error = message;
            self.emit(DocumentEvent::ErrorChanged);
        }
    }

    fn emit(&mut self, event: DocumentEvent) {
        if !self.pending.contains(&event) {
            self.pending.push(event);
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending);
        for listener in &mut self.listeners {
            for event in &events {
                listener(event);
            }
        }
    }
}

fn read_limited(path: &Path) -> io::Result<String> {
    let size = fs::metadata(path)?.len();
    if size > MAX_CONFIG_SIZE as u64 {
        let err = FancontrolError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size: MAX_CONFIG_SIZE as u64,
        };
        return Err(io::Error::new(io::ErrorKind::InvalidData, err.to_string()));
    }
    // Comments may be in any encoding; the directives themselves are ASCII
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
