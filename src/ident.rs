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

//! Identifier scheme shared by the parser and the serializer.
//!
//! Every reference in the config file has the form `hwmon<N>` optionally
//! followed by `/pwm<M>`, `/temp<K>_input` or `/fan<M>_input`. `N` is the
//! chip's enumeration index, `M`/`K` are channel indices within the chip.

use std::fmt;

use serde::Serialize;

use crate::hwmon::extract_index;

const CHIP_PREFIX: &str = "hwmon";

/// Position of a channel: chip enumeration index plus channel index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelId {
    pub hwmon: usize,
    pub channel: usize,
}

impl ChannelId {
    pub fn new(hwmon: usize, channel: usize) -> Self {
        Self { hwmon, channel }
    }

    /// `hwmonN/pwmM`
    pub fn pwm_ident(&self) -> String {
        format!("{}/pwm{}", chip_ident(self.hwmon), self.channel)
    }

    /// `hwmonN/tempK_input`
    pub fn temp_ident(&self) -> String {
        format!("{}/temp{}_input", chip_ident(self.hwmon), self.channel)
    }

    /// `hwmonN/fanM_input`
    pub fn fan_ident(&self) -> String {
        format!("{}/fan{}_input", chip_ident(self.hwmon), self.channel)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", chip_ident(self.hwmon), self.channel)
    }
}

/// `hwmonN`
pub fn chip_ident(hwmon: usize) -> String {
    format!("{}{}", CHIP_PREFIX, hwmon)
}

/// Parse the chip part of an identifier (`hwmonN`, ignoring any channel part)
pub fn parse_chip(s: &str) -> Option<usize> {
    let chip = s.split('/').next()?;
    extract_index(chip.trim(), CHIP_PREFIX, "")
}

/// Parse a PWM reference such as `hwmon0/pwm2`
pub fn parse_pwm(s: &str) -> Option<ChannelId> {
    parse_channel(s, "pwm", "")
}

/// Parse a temperature reference such as `hwmon1/temp3_input`.
///
/// The bare form `hwmon1/temp3` is accepted as well.
pub fn parse_temp(s: &str) -> Option<ChannelId> {
    parse_channel(s, "temp", "_input").or_else(|| parse_channel(s, "temp", ""))
}

fn parse_channel(s: &str, prefix: &str, suffix: &str) -> Option<ChannelId> {
    let (chip, channel) = s.trim().split_once('/')?;
    let hwmon = extract_index(chip, CHIP_PREFIX, "")?;
    let channel = extract_index(channel, prefix, suffix)?;
    Some(ChannelId { hwmon, channel })
}
