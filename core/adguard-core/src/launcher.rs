//! Starts the target executable without waiting on it.

use crate::error::{AdguardError, Result};
use crate::path_resolver::ExecutablePath;
use std::process::{Command, Stdio};
use tracing::info;

pub trait Launcher: Send + Sync {
    /// Starts `executable`. Returning `Ok` says nothing about the app being ready.
    fn launch(&self, executable: &ExecutablePath) -> Result<()>;
}

/// Spawns the executable as a detached child process.
#[derive(Debug, Clone, Default)]
pub struct CommandLauncher;

impl Launcher for CommandLauncher {
    fn launch(&self, executable: &ExecutablePath) -> Result<()> {
        let path = executable.as_path();
        let mut command = Command::new(path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| AdguardError::LaunchFailed {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %executable, pid = child.id(), "Target launched");
        Ok(())
    }
}
