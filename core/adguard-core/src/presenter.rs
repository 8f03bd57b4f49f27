//! Presentation surface the supervisor reports to.

use crate::platform;
use std::fmt;
use std::sync::Mutex;
use tracing::{info, warn};

/// User-visible status lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    PathFound,
    InstallationNotFound,
    TargetDetected,
    WaitingForProcess,
    LaunchFailed,
    Suppressing { attempt: u64 },
    Complete,
}

impl StatusMessage {
    /// Whether this status reports a condition the user has to fix.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatusMessage::InstallationNotFound | StatusMessage::LaunchFailed
        )
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::PathFound => write!(f, "Target installation found"),
            StatusMessage::InstallationNotFound => {
                write!(f, "Error: could not find the target installation")
            }
            StatusMessage::TargetDetected => write!(f, "Target is running. Waiting"),
            StatusMessage::WaitingForProcess => {
                write!(f, "No running target process found. Waiting")
            }
            StatusMessage::LaunchFailed => write!(f, "Error: failed to launch the target"),
            StatusMessage::Suppressing { attempt } => write!(f, "Hiding ads ({})", attempt),
            StatusMessage::Complete => write!(f, "Done. Moving to the background shortly"),
        }
    }
}

pub trait Presenter: Send + Sync {
    fn show_status(&self, status: StatusMessage);

    /// Suppression quiesced for the first time.
    fn progress_complete(&self);

    /// Foreground to background; called at most once per process.
    fn move_to_background(&self);
}

/// Logs status changes. Repeats of the current status are dropped.
#[derive(Debug, Default)]
pub struct TracingPresenter {
    detach_console: bool,
    last: Mutex<Option<StatusMessage>>,
}

impl TracingPresenter {
    pub fn new(detach_console: bool) -> Self {
        Self {
            detach_console,
            last: Mutex::new(None),
        }
    }
}

impl Presenter for TracingPresenter {
    fn show_status(&self, status: StatusMessage) {
        if let Ok(mut last) = self.last.lock() {
            if last.as_ref() == Some(&status) {
                return;
            }
            *last = Some(status.clone());
        }

        if status.is_error() {
            warn!(status = %status, "Status changed");
        } else {
            info!(status = %status, "Status changed");
        }
    }

    fn progress_complete(&self) {
        info!(progress = 100, "Suppression complete");
    }

    fn move_to_background(&self) {
        if self.detach_console && platform::detach_console() {
            info!("Console detached; continuing in the background");
        } else {
            info!("Continuing in the background");
        }
    }
}
