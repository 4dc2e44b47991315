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

//! Constants and default values.
//!
//! Paths, limits and defaults live here so the rest of the crate never
//! carries magic numbers.

use std::time::Duration;

/// Filesystem locations
pub mod paths {
    /// Base directory of the hwmon class
    pub const HWMON_BASE: &str = "/sys/class/hwmon";

    /// Conventional location of the fancontrol configuration
    pub const FANCONTROL_CONFIG: &str = "/etc/fancontrol";

    /// Application directory name below the XDG config home
    pub const APP_DIR: &str = "fancontrol-gui";

    /// Application settings file name
    pub const SETTINGS_FILE: &str = "settings.json";

    /// System wide settings fallback
    pub const SYSTEM_SETTINGS: &str = "/etc/fancontrol-gui/settings.json";

    /// Installed location of the privileged helper
    pub const HELPER_PROGRAM: &str = "/usr/lib/fancontrol-gui/fancontrol-helper";

    /// Program used to run the helper with elevated privileges
    pub const PKEXEC: &str = "pkexec";
}

/// Environment variables
pub mod env {
    /// Overrides the fancontrol config location
    pub const CONFIG: &str = "FANCONTROL_CONFIG";

    /// Overrides the hwmon base directory
    pub const HWMON_PATH: &str = "FANCONTROL_HWMON_PATH";

    /// tracing filter directive
    pub const LOG: &str = "FANCONTROL_LOG";
}

/// Defaults of the fancontrol document
pub mod document {
    /// Seconds between fancontrol sensor samples
    pub const DEFAULT_INTERVAL: u32 = 10;

    /// Initial value of the error status
    pub const STATUS_SUCCESS: &str = "Success";

    /// Upper bound on the config file size accepted by the parser
    pub const MAX_CONFIG_SIZE: usize = 1024 * 1024;
}

/// Defaults of a PWM fan channel
pub mod fan {
    pub const DEFAULT_MIN_TEMP: i32 = 0;
    pub const DEFAULT_MAX_TEMP: i32 = 100;
    pub const DEFAULT_MIN_START: i32 = 255;
    pub const DEFAULT_MIN_STOP: i32 = 255;
    pub const DEFAULT_MIN_PWM: i32 = 0;
    pub const DEFAULT_MAX_PWM: i32 = 255;

    /// Full duty cycle of a raw `pwmM` value
    pub const PWM_FULL: u32 = 255;

    /// Duty cycle step of the fan test ramps
    pub const TEST_STEP: u32 = 10;

    /// `pwmM_enable` value for manual control
    pub const ENABLE_MANUAL: u32 = 1;
}

/// Temperature constants
pub mod temperature {
    /// Temperature readings are in millidegrees, divide by this to get Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;
}

/// Timing constants
pub mod timing {
    use super::*;

    /// Default period of the live sensor refresh in milliseconds
    pub const REFRESH_PERIOD_MS: u64 = 1000;

    /// How long a save or load may wait on the privileged helper
    pub const HELPER_TIMEOUT_SECS: u64 = 120;

    /// Poll step while waiting for the helper process
    pub const HELPER_POLL: Duration = Duration::from_millis(50);

    /// How long helper output may trail behind the helper's exit
    pub const HELPER_PIPE_GRACE: Duration = Duration::from_secs(1);

    /// Time a fan gets to reach full speed before the test ramps it down
    pub const FAN_SPIN_UP: Duration = Duration::from_millis(2000);

    /// Time a fan gets to settle after each duty cycle step
    pub const FAN_STEP_DELAY: Duration = Duration::from_millis(1000);
}

/// Limits enforced by the privileged helper
pub mod helper {
    /// Maximum accepted length of a file name
    pub const MAX_PATH_LENGTH: usize = 256;

    /// Maximum size of a request read from stdin
    pub const MAX_REQUEST_SIZE: usize = super::document::MAX_CONFIG_SIZE + 4096;
}
