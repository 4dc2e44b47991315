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

//! Temperature and PWM fan channels.
//!
//! Setters return whether the stored value changed; callers collect those
//! into one notification per operation.

use serde::Serialize;

use crate::constants::fan;
use crate::ident::ChannelId;

/// Temperature input channel (`tempK_input`)
#[derive(Debug, Clone, Serialize)]
pub struct Temp {
    pub id: ChannelId,
    pub label: Option<String>,
    /// Last sampled value in °C
    pub value: Option<f64>,
}

impl Temp {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            label: None,
            value: None,
        }
    }

    /// Label for display, falling back to `tempK`
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("temp{}", self.id.channel))
    }
}

/// PWM output channel (`pwmM`) with its fancontrol settings
#[derive(Debug, Clone, Serialize)]
pub struct PwmFan {
    pub id: ChannelId,
    active: bool,
    temp: Option<ChannelId>,
    min_temp: i32,
    max_temp: i32,
    min_start: i32,
    min_stop: i32,
    min_pwm: i32,
    max_pwm: i32,
    /// Last sampled raw duty cycle
    pub pwm: Option<u32>,
    /// Last sampled speed of the matching `fanM_input`
    pub rpm: Option<u32>,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident, $field:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self, value: $ty) -> bool {
            if self.$field == value {
                return false;
            }
            self.$field = value;
            true
        }
    };
}

impl PwmFan {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            active: true,
            temp: None,
            min_temp: fan::DEFAULT_MIN_TEMP,
            max_temp: fan::DEFAULT_MAX_TEMP,
            min_start: fan::DEFAULT_MIN_START,
            min_stop: fan::DEFAULT_MIN_STOP,
            min_pwm: fan::DEFAULT_MIN_PWM,
            max_pwm: fan::DEFAULT_MAX_PWM,
            pwm: None,
            rpm: None,
        }
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn temp(&self) -> Option<ChannelId> {
        self.temp
    }

    pub fn has_temp(&self) -> bool {
        self.temp.is_some()
    }

    pub fn min_temp(&self) -> i32 {
        self.min_temp
    }

    pub fn max_temp(&self) -> i32 {
        self.max_temp
    }

    pub fn min_start(&self) -> i32 {
        self.min_start
    }

    pub fn min_stop(&self) -> i32 {
        self.min_stop
    }

    pub fn min_pwm(&self) -> i32 {
        self.min_pwm
    }

    pub fn max_pwm(&self) -> i32 {
        self.max_pwm
    }

    /// A fan takes part in the written config only when it is under
    /// automatic control and has a temperature source.
    pub fn is_used(&self) -> bool {
        self.active && self.temp.is_some()
    }

    setter!(set_active, active, bool);
    setter!(
        /// Associate (or with `None`, detach) the controlling temperature
        set_temp, temp, Option<ChannelId>
    );
    setter!(set_min_temp, min_temp, i32);
    setter!(set_max_temp, max_temp, i32);
    setter!(set_min_start, min_start, i32);
    setter!(set_min_stop, min_stop, i32);
    setter!(set_min_pwm, min_pwm, i32);
    setter!(set_max_pwm, max_pwm, i32);

    /// Drop the temperature association ahead of a fresh parse
    pub fn reset(&mut self) -> bool {
        self.set_temp(None)
    }

    /// Set one of the numeric settings by field
    pub fn set_threshold(&mut self, field: Threshold, value: i32) -> bool {
        match field {
            Threshold::MinTemp => self.set_min_temp(value),
            Threshold::MaxTemp => self.set_max_temp(value),
            Threshold::MinStart => self.set_min_start(value),
            Threshold::MinStop => self.set_min_stop(value),
            Threshold::MinPwm => self.set_min_pwm(value),
            Threshold::MaxPwm => self.set_max_pwm(value),
        }
    }

    pub fn threshold(&self, field: Threshold) -> i32 {
        match field {
            Threshold::MinTemp => self.min_temp,
            Threshold::MaxTemp => self.max_temp,
            Threshold::MinStart => self.min_start,
            Threshold::MinStop => self.min_stop,
            Threshold::MinPwm => self.min_pwm,
            Threshold::MaxPwm => self.max_pwm,
        }
    }
}

/// Per-fan numeric settings, in the order they are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Threshold {
    MinTemp,
    MaxTemp,
    MinStart,
    MinStop,
    MinPwm,
    MaxPwm,
}

impl Threshold {
    pub const ALL: [Threshold; 6] = [
        Threshold::MinTemp,
        Threshold::MaxTemp,
        Threshold::MinStart,
        Threshold::MinStop,
        Threshold::MinPwm,
        Threshold::MaxPwm,
    ];

    /// Directive keyword in the config file
    pub fn directive(&self) -> &'static str {
        match self {
            Threshold::MinTemp => "MINTEMP",
            Threshold::MaxTemp => "MAXTEMP",
            Threshold::MinStart => "MINSTART",
            Threshold::MinStop => "MINSTOP",
            Threshold::MinPwm => "MINPWM",
            Threshold::MaxPwm => "MAXPWM",
        }
    }

    /// Accepts the directive keyword in any case (`maxtemp`, `MAXTEMP`)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.directive().eq_ignore_ascii_case(name))
    }
}
