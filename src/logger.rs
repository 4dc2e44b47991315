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

use std::env;

use crate::constants::env as env_vars;

/// Filter directive: `$FANCONTROL_LOG`, else `debug` when verbose, else `info`
pub fn log_filter(verbose: bool) -> String {
    env::var(env_vars::LOG).unwrap_or_else(|_| {
        if verbose { "debug" } else { "info" }.to_string()
    })
}

/// Install the tracing subscriber. Logs go to stderr so command output on
/// stdout stays clean. A second call is a no-op.
pub fn init_logging(verbose: bool) {
    let filter = log_filter(verbose);
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter.as_str())
        .with_writer(std::io::stderr)
        .try_init();
}
