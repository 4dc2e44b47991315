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

//! Sensor registry backed by `/sys/class/hwmon`.
//!
//! Each entry of the hwmon class directory is a symlink to a device
//! directory. Discovery resolves every entry, reads the driver name and
//! collects the `tempK_input` and `pwmM` channels.
//!
//! The registry owns every channel. Other parts of the crate refer to
//! channels by [`ChannelId`] only, so a rediscovery is a plain swap of the
//! chip list plus a bump of the generation counter.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::constants::{env as env_vars, paths, temperature};
use crate::ident::ChannelId;
use crate::sensors::{PwmFan, Temp};

/// One hwmon device
#[derive(Debug, Clone, Serialize)]
pub struct Chip {
    /// Position in enumeration order, the `N` of `hwmonN`
    pub index: usize,
    /// Resolved device directory
    pub path: PathBuf,
    /// Driver name, cut at the first `.`
    pub name: String,
    pub temps: Vec<Temp>,
    pub pwm_fans: Vec<PwmFan>,
}

impl Chip {
    /// Temperature channel by channel index (not position)
    pub fn temp(&self, channel: usize) -> Option<&Temp> {
        self.temps.iter().find(|t| t.id.channel == channel)
    }

    /// PWM channel by channel index (not position)
    pub fn pwm_fan(&self, channel: usize) -> Option<&PwmFan> {
        self.pwm_fans.iter().find(|p| p.id.channel == channel)
    }

    pub fn pwm_fan_mut(&mut self, channel: usize) -> Option<&mut PwmFan> {
        self.pwm_fans.iter_mut().find(|p| p.id.channel == channel)
    }

    /// Re-read every live value of this chip.
    ///
    /// Returns the number of channels that produced a reading.
    pub fn refresh(&mut self) -> usize {
        let mut sampled = 0;
        for temp in &mut self.temps {
            temp.value = read_temp_celsius(&self.path, temp.id.channel);
            sampled += usize::from(temp.value.is_some());
        }
        for fan in &mut self.pwm_fans {
            let channel = fan.id.channel;
            fan.pwm = read_u32(self.path.join(format!("pwm{}", channel)));
            fan.rpm = read_u32(self.path.join(format!("fan{}_input", channel)));
            sampled += usize::from(fan.pwm.is_some());
        }
        sampled
    }
}

/// Current snapshot of all chips plus its generation number
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    root: PathBuf,
    generation: u64,
    chips: Vec<Chip>,
}

impl SensorRegistry {
    /// Discover chips under the configured hwmon root
    pub fn discover() -> Self {
        Self::discover_at(hwmon_root())
    }

    /// Discover chips under `root`
    pub fn discover_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let chips = discover_chips(&root);
        Self {
            root,
            generation: 1,
            chips,
        }
    }

    /// Registry over a fixed set of chips; `rediscover` reads from `root`
    pub fn from_chips(root: impl Into<PathBuf>, chips: Vec<Chip>) -> Self {
        Self {
            root: root.into(),
            generation: 1,
            chips,
        }
    }

    /// Throw away every chip and enumerate again.
    ///
    /// Any [`ChannelId`] or handle taken before this call belongs to the old
    /// generation.
    pub fn rediscover(&mut self) -> u64 {
        self.chips = discover_chips(&self.root);
        self.generation += 1;
        info!(generation = self.generation, chips = self.chips.len(), "Hardware re-enumerated");
        self.generation
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn chips(&self) -> &[Chip] {
        &self.chips
    }

    pub fn chip(&self, index: usize) -> Option<&Chip> {
        self.chips.get(index)
    }

    pub fn temp(&self, id: ChannelId) -> Option<&Temp> {
        self.chip(id.hwmon)?.temp(id.channel)
    }

    pub fn pwm_fan(&self, id: ChannelId) -> Option<&PwmFan> {
        self.chip(id.hwmon)?.pwm_fan(id.channel)
    }

    pub fn pwm_fan_mut(&mut self, id: ChannelId) -> Option<&mut PwmFan> {
        self.chips.get_mut(id.hwmon)?.pwm_fan_mut(id.channel)
    }

    /// Every PWM channel in enumeration order
    pub fn pwm_fans(&self) -> impl Iterator<Item = &PwmFan> {
        self.chips.iter().flat_map(|c| c.pwm_fans.iter())
    }

    pub fn pwm_fans_mut(&mut self) -> impl Iterator<Item = &mut PwmFan> {
        self.chips.iter_mut().flat_map(|c| c.pwm_fans.iter_mut())
    }

    /// Re-sample every live reading
    pub fn refresh(&mut self) -> usize {
        let sampled = self.chips.iter_mut().map(Chip::refresh).sum();
        trace!(sampled, "Sensors refreshed");
        sampled
    }
}

/// hwmon root: `$FANCONTROL_HWMON_PATH` or `/sys/class/hwmon`
pub fn hwmon_root() -> PathBuf {
    env::var_os(env_vars::HWMON_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(paths::HWMON_BASE))
}

/// Enumerate all resolvable chips under `root`.
///
/// An unreadable root yields an empty list; hosts without hwmon are normal.
pub fn discover_chips(root: &Path) -> Vec<Chip> {
    let entries = match fs::read_dir(root) {
        Ok(it) => it,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "hwmon directory is not readable");
            return Vec::new();
        }
    };

    let mut links: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    links.sort_by(|a, b| entry_sort_key(a).cmp(&entry_sort_key(b)));

    let mut chips = Vec::new();
    for link in links {
        let dir = match fs::canonicalize(&link) {
            Ok(p) => p,
            Err(e) => {
                debug!(path = %link.display(), error = %e, "Skipping unresolvable hwmon entry");
                continue;
            }
        };
        if !dir.is_dir() {
            continue;
        }
        let chip = read_chip(chips.len(), dir);
        info!(
            index = chip.index,
            chip = %chip.name,
            temps = chip.temps.len(),
            pwms = chip.pwm_fans.len(),
            "Found hwmon chip"
        );
        chips.push(chip);
    }

    debug!("Total hwmon chips found: {}", chips.len());
    chips
}

// hwmon10 sorts after hwmon9; names without a number go last.
fn entry_sort_key(path: &Path) -> (usize, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let number = extract_index(&name, "hwmon", "").unwrap_or(usize::MAX);
    (number, name)
}

fn read_chip(index: usize, dir: PathBuf) -> Chip {
    let name = read_trimmed(dir.join("name"))
        .ok()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".into())
        });
    let name = name.split('.').next().unwrap_or_default().to_string();

    let mut temps = Vec::new();
    let mut pwm_fans = Vec::new();

    if let Ok(dir_iter) = fs::read_dir(&dir) {
        for file in dir_iter.flatten() {
            let fname = file.file_name();
            let fname = fname.to_string_lossy();
            if fname.starts_with("temp") && fname.ends_with("_input") {
                if let Some(idx) = extract_index(&fname, "temp", "_input") {
                    let mut temp = Temp::new(ChannelId::new(index, idx));
                    temp.label = read_trimmed(dir.join(format!("temp{}_label", idx))).ok();
                    temps.push(temp);
                }
            } else if fname.starts_with("pwm") && !fname.contains('_') {
                if let Some(idx) = extract_index(&fname, "pwm", "") {
                    pwm_fans.push(PwmFan::new(ChannelId::new(index, idx)));
                }
            }
        }
    }

    temps.sort_by_key(|t| t.id.channel);
    pwm_fans.sort_by_key(|p| p.id.channel);

    let mut chip = Chip {
        index,
        path: dir,
        name,
        temps,
        pwm_fans,
    };
    chip.refresh();
    chip
}

fn read_temp_celsius(dir: &Path, channel: usize) -> Option<f64> {
    let raw = read_trimmed(dir.join(format!("temp{}_input", channel))).ok()?;
    let millidegrees = raw.parse::<i64>().ok()?;
    Some(millidegrees as f64 / temperature::MILLIDEGREE_DIVISOR)
}

fn read_u32(path: PathBuf) -> Option<u32> {
    read_trimmed(path).ok()?.parse().ok()
}

pub(crate) fn read_trimmed<P: AsRef<Path>>(p: P) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(p)?.read_to_string(&mut s)?;
    Ok(s.trim().to_string())
}

/// Number between `prefix` and `suffix`, e.g. `extract_index("fan2_input", "fan", "_input")`
pub fn extract_index(fname: &str, prefix: &str, suffix: &str) -> Option<usize> {
    if fname.len() >= prefix.len() + suffix.len()
        && fname.starts_with(prefix)
        && fname.ends_with(suffix)
    {
        let mid = &fname[prefix.len()..fname.len() - suffix.len()];
        mid.parse().ok()
    } else {
        None
    }
}
