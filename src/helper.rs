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

//! Privileged read/write of the config file.
//!
//! `/etc/fancontrol` is usually root-owned. When a direct read or write is
//! refused with a permission error, the document hands the operation to a
//! [`PrivilegedHelper`]. The stock implementation, [`PkexecHelper`], starts
//! the `fancontrol-helper` binary through pkexec and exchanges one JSON
//! request and one JSON response over its stdin/stdout.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{document, helper as limits, paths, timing};
use crate::error::FancontrolError;

/// Request sent to the helper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum HelperRequest {
    Read { filename: String },
    Write { filename: String, content: String },
}

/// Reply printed by the helper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HelperResponse {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Error { message: String },
}

/// Fallback path for reads and writes that need elevated privileges.
///
/// Both calls block until the operation finished. The `Err` string is shown
/// to the user as is.
#[cfg_attr(test, mockall::automock)]
pub trait PrivilegedHelper: Send {
    fn read(&self, path: &Path) -> Result<String, String>;
    fn write(&self, path: &Path, content: &str) -> Result<(), String>;
}

/// Helper for setups without privilege escalation
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHelper;

impl PrivilegedHelper for NoHelper {
    fn read(&self, path: &Path) -> Result<String, String> {
        Err(format!("Permission denied reading {}", path.display()))
    }

    fn write(&self, path: &Path, _content: &str) -> Result<(), String> {
        Err(format!("Permission denied writing {}", path.display()))
    }
}

/// Runs the helper program through pkexec with a bounded wait
#[derive(Debug, Clone)]
pub struct PkexecHelper {
    launcher: PathBuf,
    program: PathBuf,
    timeout: Duration,
}

impl PkexecHelper {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            launcher: PathBuf::from(paths::PKEXEC),
            program: program.into(),
            timeout,
        }
    }

    /// Use another launcher in place of pkexec (e.g. `sudo`, or `sh` in tests)
    pub fn with_launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.launcher = launcher.into();
        self
    }

    fn call(&self, request: &HelperRequest) -> Result<HelperResponse, String> {
        let payload = serde_json::to_string(request).map_err(|e| e.to_string())?;

        debug!(launcher = %self.launcher.display(), program = %self.program.display(), "Starting privileged helper");
        let mut child = Command::new(&self.launcher)
            .arg(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Failed to run {}: {}", self.launcher.display(), e))?;

        // Every pipe gets its own thread; only the deadline loop blocks here.
        let (write_tx, write_rx) = mpsc::channel();
        if let Some(mut stdin) = child.stdin.take() {
            thread::spawn(move || {
                let _ = write_tx.send(stdin.write_all(payload.as_bytes()));
            });
        }
        let stdout_rx = drain(child.stdout.take());
        let stderr_rx = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!(timeout_secs = self.timeout.as_secs_f32(), "Privileged helper timed out");
                    return Err(FancontrolError::Timeout(format!(
                        "privileged helper did not answer within {:.1}s",
                        self.timeout.as_secs_f32()
                    ))
                    .to_string());
                }
                Ok(None) => thread::sleep(timing::HELPER_POLL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("Failed to wait for helper: {}", e));
                }
            }
        };

        let stdout = stdout_rx.recv_timeout(timing::HELPER_PIPE_GRACE).unwrap_or_default();
        if let Ok(response) = serde_json::from_str::<HelperResponse>(stdout.trim()) {
            return Ok(response);
        }

        let stderr = stderr_rx.recv_timeout(timing::HELPER_PIPE_GRACE).unwrap_or_default();
        if let Ok(Err(e)) = write_rx.try_recv() {
            debug!(error = %e, "Helper did not take the whole request");
        }
        Err(match status.code() {
            Some(126) | Some(127) => "Authorization failed".to_string(),
            _ if !stderr.trim().is_empty() => stderr.trim().to_string(),
            _ => format!("Privileged helper exited with {}", status),
        })
    }
}

/// Read `pipe` to the end on its own thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            let _ = tx.send(String::from_utf8_lossy(&bytes).into_owned());
        });
    }
    rx
}

impl PrivilegedHelper for PkexecHelper {
    fn read(&self, path: &Path) -> Result<String, String> {
        let request = HelperRequest::Read {
            filename: path.to_string_lossy().into_owned(),
        };
        match self.call(&request)? {
            HelperResponse::Ok { content } => Ok(content.unwrap_or_default()),
            HelperResponse::Error { message } => Err(message),
        }
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), String> {
        let request = HelperRequest::Write {
            filename: path.to_string_lossy().into_owned(),
            content: content.to_string(),
        };
        match self.call(&request)? {
            HelperResponse::Ok { .. } => Ok(()),
            HelperResponse::Error { message } => Err(message),
        }
    }
}

/// Whether a failed direct access should be retried through the helper
pub fn needs_privilege(err: &io::Error, path: &Path) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied && path.exists()
}

/// Read `path` directly, falling back to `helper` on a permission error.
///
/// `Ok(None)` means the file does not exist.
pub fn read_with_fallback<F>(
    path: &Path,
    direct: F,
    helper: &dyn PrivilegedHelper,
) -> Result<Option<String>, String>
where
    F: FnOnce(&Path) -> io::Result<String>,
{
    match direct(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) if needs_privilege(&e, path) => {
            info!(path = %path.display(), "Reading through privileged helper");
            helper.read(path).map(Some)
        }
        Err(source) => Err(FancontrolError::FileRead {
            path: path.to_path_buf(),
            source,
        }
        .to_string()),
    }
}

/// Write `path` directly, falling back to `helper` on a permission error.
///
/// A file that does not exist yet is escalated when its directory exists.
pub fn write_with_fallback<F>(
    path: &Path,
    content: &str,
    direct: F,
    helper: &dyn PrivilegedHelper,
) -> Result<(), String>
where
    F: FnOnce(&Path, &str) -> io::Result<()>,
{
    match direct(path, content) {
        Ok(()) => Ok(()),
        Err(e)
            if needs_privilege(&e, path)
                || (e.kind() == io::ErrorKind::PermissionDenied
                    && path.parent().map_or(false, Path::exists)) =>
        {
            info!(path = %path.display(), "Writing through privileged helper");
            helper.write(path, content)
        }
        Err(source) => Err(FancontrolError::FileWrite {
            path: path.to_path_buf(),
            source,
        }
        .to_string()),
    }
}

// ============================================================================
// Helper side
// ============================================================================

/// Check a file name received by the helper.
///
/// Only plain absolute paths are accepted.
pub fn validate_filename(name: &str) -> Result<PathBuf, String> {
    if name.is_empty() {
        return Err("empty file name".to_string());
    }
    if name.len() > limits::MAX_PATH_LENGTH {
        return Err(format!("file name longer than {} bytes", limits::MAX_PATH_LENGTH));
    }
    if name.chars().any(char::is_control) {
        return Err("file name contains control characters".to_string());
    }
    let path = PathBuf::from(name);
    if !path.is_absolute() {
        return Err(format!("{} is not an absolute path", name));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(format!("{} contains '..'", name));
    }
    Ok(path)
}

/// Carry out one request as the privileged side
pub fn handle_request(request: HelperRequest) -> HelperResponse {
    match serve(request) {
        Ok(content) => HelperResponse::Ok { content },
        Err(e) => HelperResponse::Error {
            message: e.to_string(),
        },
    }
}

fn serve(request: HelperRequest) -> crate::error::Result<Option<String>> {
    match request {
        HelperRequest::Read { filename } => {
            let path = validate_filename(&filename).map_err(FancontrolError::helper)?;
            let size = fs::metadata(&path)
                .map_err(|source| FancontrolError::FileRead { path: path.clone(), source })?
                .len();
            if size > document::MAX_CONFIG_SIZE as u64 {
                return Err(FancontrolError::FileTooLarge {
                    path,
                    size,
                    max_size: document::MAX_CONFIG_SIZE as u64,
                });
            }
            let bytes =
                fs::read(&path).map_err(|source| FancontrolError::FileRead { path, source })?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        HelperRequest::Write { filename, content } => {
            let path = validate_filename(&filename).map_err(FancontrolError::helper)?;
            if content.len() > document::MAX_CONFIG_SIZE {
                return Err(FancontrolError::FileTooLarge {
                    path,
                    size: content.len() as u64,
                    max_size: document::MAX_CONFIG_SIZE as u64,
                });
            }
            fs::write(&path, content)
                .map_err(|source| FancontrolError::FileWrite { path, source })?;
            Ok(None)
        }
    }
}
