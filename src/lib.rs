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

//! Fancontrol-GUI - editor and monitor for the Linux `fancontrol` configuration
//!
//! This library discovers hwmon chips, reads `/etc/fancontrol` into fan and
//! temperature objects bound to that hardware, and writes the edited state
//! back in the same format, escalating through a privileged helper when the
//! file is root-owned.

pub mod constants;
pub mod error;
pub mod ident;
pub mod sensors;
pub mod hwmon;
pub mod parser;
pub mod serializer;
pub mod helper;
pub mod config;
pub mod fantest;
pub mod monitor;
pub mod settings;
pub mod logger;

#[cfg(test)]
pub mod test_utils;

pub use config::{ConfigDocument, DocumentEvent, FanHandle};
pub use error::{FancontrolError, Result};
pub use fantest::{Calibration, FanTestReport, FanTestSettings};
pub use hwmon::{Chip, SensorRegistry};
pub use ident::ChannelId;
pub use sensors::{PwmFan, Temp, Threshold};
pub use settings::AppSettings;
