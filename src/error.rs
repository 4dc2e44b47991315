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

//! Unified error handling
//!
//! One error type shared by the registry, the document and the helper bridge.

use std::io;
use std::path::PathBuf;

/// Result type alias using FancontrolError
pub type Result<T> = std::result::Result<T, FancontrolError>;

#[derive(thiserror::Error, Debug)]
pub enum FancontrolError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    // ============================================================================
    // Sensor Model Errors
    // ============================================================================
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("No such channel: {0}")]
    UnknownChannel(String),

    #[error("Stale handle from hardware generation {held} (current {current})")]
    StaleHandle {
        held: u64,
        current: u64,
    },

    #[error("Fan test on {channel} failed: {message}")]
    FanTest {
        channel: String,
        message: String,
    },

    // ============================================================================
    // Privileged Helper Errors
    // ============================================================================
    #[error("Privileged helper failed: {0}")]
    Helper(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FancontrolError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a helper error from a string
    pub fn helper(msg: impl Into<String>) -> Self {
        Self::Helper(msg.into())
    }
}
