//! # Session Identity
//!
//! The remote list is keyed by a session (folder) identifier that an earlier login
//! step persisted on the device. It is read once at startup. A missing or blank
//! identity is an `Auth` error: only the operator can fix it.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{CaptureError, CaptureResult};

/// Persisted session / folder identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// Wrap an identifier, rejecting blank values.
    pub fn new(id: impl Into<String>) -> CaptureResult<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(CaptureError::auth("load session", "session identity is blank")
                .with_recovery_suggestion("Sign in again to store a session identity"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the identity persisted at `path`.
    pub fn load(path: &Path) -> CaptureResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CaptureError::auth(
                    "load session",
                    format!("no session identity stored at {}", path.display()),
                )
                .with_recovery_suggestion("Run `fieldcap session <ID>` to store one")
            } else {
                CaptureError::io("read session identity", e).with_path(path.display().to_string())
            }
        })?;
        let first_line = contents.lines().next().unwrap_or_default();
        Self::new(first_line)
    }

    /// Persist the identity at `path`, creating parent directories as needed.
    pub fn store(&self, path: &Path) -> CaptureResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::io("create session directory", e)
                    .with_path(parent.display().to_string())
            })?;
        }
        fs::write(path, format!("{}\n", self.0)).map_err(|e| {
            CaptureError::io("write session identity", e).with_path(path.display().to_string())
        })
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
