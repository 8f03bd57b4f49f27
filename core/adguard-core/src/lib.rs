//! # adguard-core
//!
//! Discovery and supervision engine for keeping a desktop app's ads hidden.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. The supervisor owns a
//!   dedicated thread and sleeps on a cancellation token between steps.
//! - **Graceful degradation**: Missing registry keys, denied process reads and
//!   failing probes are logged and absorbed, never propagated out of a step.
//! - **Seams are traits**: registry, process table, launcher, probe and
//!   presenter can all be swapped for fakes, so the state machine is testable
//!   without Windows or a UI.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use adguard_core::*;
//!
//! let config = load_config(None)?;
//! let supervisor = Supervisor::new(
//!     PathResolver::standard(SystemRegistry, &config.target),
//!     ProcessLocator::new(SystemProcessTable::new(), config.target.suffix.clone()),
//!     Box::new(CommandLauncher),
//!     Box::new(CommandProbe::from_config(&config.probe)?),
//!     Box::new(TracingPresenter::new(config.presentation.detach_console)),
//!     config.timing.clone(),
//! );
//! supervisor.spawn(CancellationToken::new())?.join();
//! ```

pub mod config;
pub mod error;
pub mod launcher;
pub mod path_resolver;
pub mod patterns;
pub mod platform;
pub mod presenter;
pub mod probe;
pub mod process;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::*;
pub use error::{AdguardError, Result};
pub use launcher::{CommandLauncher, Launcher};
pub use path_resolver::{
    extract_executable_from_command, CoLocatedSource, ExecutablePath, PathResolver, PathSource,
    RegistryReader, RegistrySource,
};
pub use platform::SystemRegistry;
pub use presenter::{Presenter, StatusMessage, TracingPresenter};
pub use probe::{CommandProbe, ProbeOutcome, SuppressionProbe};
pub use process::{
    comparison_key, ProcessEntry, ProcessLocator, ProcessTable, SystemProcessTable, WindowHandle,
};
pub use supervisor::{CancellationToken, Step, SupervisionState, Supervisor};
