//! Supervision state: the current step plus per-cycle bookkeeping.
//!
//! Steps that need a window carry it, so the supervisor cannot be
//! suppressing without a handle found in the current cycle.

use crate::path_resolver::ExecutablePath;
use crate::process::WindowHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Looking for the executable.
    Locating,
    /// Executable known; waiting for its window to show up.
    AwaitingProcess { path: ExecutablePath },
    /// Window known; counting consecutive clear probes.
    Suppressing {
        path: ExecutablePath,
        window: WindowHandle,
        confirmations: u32,
    },
    /// Quiesced; probing forever as a health check.
    Suppressed {
        path: ExecutablePath,
        window: WindowHandle,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Locating => "locating",
            Step::AwaitingProcess { .. } => "awaiting_process",
            Step::Suppressing { .. } => "suppressing",
            Step::Suppressed { .. } => "suppressed",
        }
    }

    pub fn window(&self) -> Option<WindowHandle> {
        match self {
            Step::Suppressing { window, .. } | Step::Suppressed { window, .. } => Some(*window),
            Step::Locating | Step::AwaitingProcess { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisionState {
    pub step: Step,
    /// A launch was tried during this cycle.
    pub launch_attempted: bool,
    /// That launch failed; no more launches until the next cycle.
    pub launch_failed: bool,
    /// Suppression attempts since startup. Never reset.
    pub attempts: u64,
    pub in_foreground: bool,
    /// Background transition scheduled for the next step.
    pub background_pending: bool,
}

impl SupervisionState {
    pub fn new() -> Self {
        Self {
            step: Step::Locating,
            launch_attempted: false,
            launch_failed: false,
            attempts: 0,
            in_foreground: true,
            background_pending: false,
        }
    }

    /// Back to `Locating`; the next cycle may launch again.
    pub fn reset_cycle(&mut self) {
        self.step = Step::Locating;
        self.launch_attempted = false;
        self.launch_failed = false;
    }
}

impl Default for SupervisionState {
    fn default() -> Self {
        Self::new()
    }
}
