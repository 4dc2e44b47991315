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

//! Privileged helper for fancontrol-gui.
//!
//! Started through pkexec. Reads one JSON request from stdin, performs the
//! read or write as root and prints one JSON response on stdout.

use std::io::{self, Read, Write};

use fancontrol_gui::constants::helper::MAX_REQUEST_SIZE;
use fancontrol_gui::helper::{handle_request, HelperRequest, HelperResponse};

fn respond(response: &HelperResponse) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, response)?;
    stdout.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    if unsafe { libc::geteuid() } != 0 {
        respond(&HelperResponse::Error {
            message: "fancontrol-helper must run as root".to_string(),
        })?;
        std::process::exit(1);
    }

    let mut input = String::new();
    io::stdin()
        .take(MAX_REQUEST_SIZE as u64 + 1)
        .read_to_string(&mut input)?;
    if input.len() > MAX_REQUEST_SIZE {
        respond(&HelperResponse::Error {
            message: format!("request larger than {} bytes", MAX_REQUEST_SIZE),
        })?;
        std::process::exit(1);
    }

    let response = match serde_json::from_str::<HelperRequest>(input.trim()) {
        Ok(request) => handle_request(request),
        Err(e) => HelperResponse::Error {
            message: format!("invalid request: {}", e),
        },
    };
    respond(&response)
}
