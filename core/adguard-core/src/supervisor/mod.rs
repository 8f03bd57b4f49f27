//! The supervision loop.
//!
//! ```text
//! Locating ──path──▶ AwaitingProcess ──window──▶ Suppressing ──N clears──▶ Suppressed
//!    ▲                  │  (launch once,                │                       │
//!    │                  │   then re-poll)               │ work remains          │ work remains
//!    └──────────────────┴───────────────────────────────┴───────────────────────┘
//! ```
//!
//! [`Supervisor::step`] runs one transition and returns how long to pause
//! before the next. [`Supervisor::run`] loops forever, waiting on a
//! [`CancellationToken`] between steps so it can be stopped promptly.
//!
//! Two conditions stall forward progress: no executable path, and a failed
//! launch. Both keep re-checking at the slower stall cadence so an external
//! fix (app installed, app started by hand) is picked up without a restart.

mod cancel;
mod state;

pub use cancel::CancellationToken;
pub use state::{Step, SupervisionState};

use crate::config::TimingConfig;
use crate::error::{AdguardError, Result};
use crate::launcher::Launcher;
use crate::path_resolver::{ExecutablePath, PathResolver};
use crate::presenter::{Presenter, StatusMessage};
use crate::probe::{ProbeOutcome, SuppressionProbe};
use crate::process::{ProcessLocator, ProcessTable, WindowHandle};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Supervisor<T: ProcessTable> {
    resolver: PathResolver,
    locator: ProcessLocator<T>,
    launcher: Box<dyn Launcher>,
    probe: Box<dyn SuppressionProbe>,
    presenter: Box<dyn Presenter>,
    timing: TimingConfig,
    state: SupervisionState,
}

impl<T: ProcessTable + 'static> Supervisor<T> {
    pub fn new(
        resolver: PathResolver,
        locator: ProcessLocator<T>,
        launcher: Box<dyn Launcher>,
        probe: Box<dyn SuppressionProbe>,
        presenter: Box<dyn Presenter>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            resolver,
            locator,
            launcher,
            probe,
            presenter,
            timing,
            state: SupervisionState::new(),
        }
    }

    pub fn state(&self) -> &SupervisionState {
        &self.state
    }

    /// Runs until `token` is cancelled.
    pub fn run(&mut self, token: &CancellationToken) {
        info!("Supervisor started");
        let mut pause = self.timing.step_interval();
        loop {
            if token.wait_timeout(pause) {
                break;
            }
            pause = self.step();
        }
        info!(step = self.state.step.name(), "Supervisor stopped");
    }

    /// Runs the supervisor on a dedicated thread.
    pub fn spawn(mut self, token: CancellationToken) -> Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("adguard-supervisor".to_string())
            .spawn(move || self.run(&token))
            .map_err(|source| AdguardError::Io {
                context: "Failed to spawn supervisor thread".to_string(),
                source,
            })
    }

    /// Performs one transition; returns the pause before the next one.
    pub fn step(&mut self) -> Duration {
        let before = self.state.step.name();
        let pause = match self.state.step.clone() {
            Step::Locating => self.locate(),
            Step::AwaitingProcess { path } => self.await_process(path),
            Step::Suppressing {
                path,
                window,
                confirmations,
            } => self.suppress(path, window, confirmations),
            Step::Suppressed { path, window } => self.hold(path, window),
        };
        let after = self.state.step.name();
        if before != after {
            debug!(from = before, to = after, "Supervision step changed");
        }
        pause
    }

    fn locate(&mut self) -> Duration {
        match self.resolver.resolve() {
            Some(path) => {
                info!(path = %path, "Target executable located");
                self.presenter.show_status(StatusMessage::PathFound);
                self.state.step = Step::AwaitingProcess { path };
                self.timing.step_interval()
            }
            None => {
                self.presenter
                    .show_status(StatusMessage::InstallationNotFound);
                self.timing.stall_interval()
            }
        }
    }

    fn await_process(&mut self, path: ExecutablePath) -> Duration {
        if let Some(window) = self.locator.locate_window(&path) {
            info!(handle = %window, "Target window found");
            self.presenter.show_status(StatusMessage::TargetDetected);
            self.state.step = Step::Suppressing {
                path,
                window,
                confirmations: 0,
            };
            return self.timing.step_interval();
        }

        if self.state.launch_failed {
            return self.timing.stall_interval();
        }

        self.presenter.show_status(StatusMessage::WaitingForProcess);
        if self.state.launch_attempted {
            return self.timing.step_interval();
        }

        self.state.launch_attempted = true;
        match self.launcher.launch(&path) {
            Ok(()) => self.timing.launch_settle(),
            Err(err) => {
                warn!(path = %path, error = %err, "Cannot start target");
                self.state.launch_failed = true;
                self.presenter.show_status(StatusMessage::LaunchFailed);
                self.timing.stall_interval()
            }
        }
    }

    fn suppress(
        &mut self,
        path: ExecutablePath,
        window: WindowHandle,
        confirmations: u32,
    ) -> Duration {
        self.presenter.show_status(StatusMessage::Suppressing {
            attempt: self.state.attempts,
        });
        self.state.attempts = self.state.attempts.saturating_add(1);

        if self.probe_window(window) {
            let confirmations = confirmations.saturating_add(1);
            if confirmations >= self.timing.confirmations_required {
                info!(handle = %window, "Ads suppressed");
                self.presenter.show_status(StatusMessage::Complete);
                self.presenter.progress_complete();
                self.state.step = Step::Suppressed { path, window };
            } else {
                self.state.step = Step::Suppressing {
                    path,
                    window,
                    confirmations,
                };
            }
        } else {
            self.state.reset_cycle();
        }
        self.timing.step_interval()
    }

    fn hold(&mut self, path: ExecutablePath, window: WindowHandle) -> Duration {
        if self.state.in_foreground {
            if !self.state.background_pending {
                self.state.background_pending = true;
                return self.timing.background_delay();
            }
            self.state.background_pending = false;
            self.state.in_foreground = false;
            self.presenter.move_to_background();
        }

        if !self.probe_window(window) {
            info!(path = %path, "New ads detected; starting over");
            self.state.reset_cycle();
        }
        self.timing.step_interval()
    }

    /// True when the probe reports nothing left to do.
    fn probe_window(&self, window: WindowHandle) -> bool {
        let outcome = self.probe.close_ads(window);
        match &outcome {
            ProbeOutcome::Clear => {}
            ProbeOutcome::WorkRemains(code) => {
                debug!(handle = %window, code, "Suppression probe reports work remaining")
            }
            ProbeOutcome::Failed(reason) => {
                warn!(handle = %window, reason = %reason, "Suppression probe failed")
            }
        }
        outcome.is_clear()
    }
}
