//! The ad-suppression probe seam.
//!
//! The probe closes or hides advertisement windows inside the target and
//! reports whether anything was (or still needs to be) done. Its internals
//! live outside this crate; [`CommandProbe`] drives an external helper.

use crate::config::ProbeConfig;
use crate::error::{AdguardError, Result};
use crate::process::WindowHandle;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Status 0: nothing needed action.
    Clear,
    /// Non-zero status: something was closed or still needs closing.
    WorkRemains(i32),
    /// The probe itself failed. Treated like `WorkRemains(1)`.
    Failed(String),
}

impl ProbeOutcome {
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            ProbeOutcome::Clear
        } else {
            ProbeOutcome::WorkRemains(code)
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, ProbeOutcome::Clear)
    }
}

/// Must be safe to call repeatedly, including with a stale handle.
pub trait SuppressionProbe: Send + Sync {
    fn close_ads(&self, window: WindowHandle) -> ProbeOutcome;
}

/// Runs `program [args..] <hwnd>` and maps the exit code.
///
/// The helper gets `timeout` to finish; after that it is killed and the
/// run counts as [`ProbeOutcome::Failed`].
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        let program = config
            .program
            .clone()
            .ok_or(AdguardError::ProbeNotConfigured)?;
        Ok(Self::new(program, config.args.clone(), config.timeout()))
    }

    fn run(&self, window: WindowHandle) -> Result<i32> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(window.raw().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                AdguardError::ProbeFailed(format!("{}: {}", self.program.display(), err))
            })?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    warn!(
                        pid = child.id(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Suppression helper timed out; killing it"
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(AdguardError::ProbeFailed(format!(
                        "{} timed out after {:?}",
                        self.program.display(),
                        self.timeout
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    let _ = child.kill();
                    return Err(AdguardError::ProbeFailed(format!(
                        "{}: {}",
                        self.program.display(),
                        err
                    )));
                }
            }
        };

        status
            .code()
            .ok_or_else(|| AdguardError::ProbeFailed("probe terminated by signal".to_string()))
    }
}

impl SuppressionProbe for CommandProbe {
    fn close_ads(&self, window: WindowHandle) -> ProbeOutcome {
        match self.run(window) {
            Ok(code) => {
                debug!(handle = %window, code, "Suppression probe finished");
                ProbeOutcome::from_code(code)
            }
            Err(err) => ProbeOutcome::Failed(err.to_string()),
        }
    }
}
