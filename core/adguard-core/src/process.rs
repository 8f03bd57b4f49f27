//! Resolves a running instance of the target executable to its window.
//!
//! Matching is two-phase: a cheap name comparison (suffix stripped,
//! lowercased) selects candidates, then the full module path must equal the
//! resolved executable path. Module-path reads can be denied for processes
//! owned by other users; those candidates are skipped, not fatal.

use crate::error::{AdguardError, Result};
use crate::path_resolver::ExecutablePath;
use crate::platform;
use std::fmt;
use std::num::NonZeroIsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sysinfo::{ProcessRefreshKind, System};
#[cfg(not(windows))]
use sysinfo::UpdateKind;
use tracing::{debug, error, info, warn};

/// Non-owning reference to a top-level OS window. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(NonZeroIsize);

impl WindowHandle {
    /// `None` for the null handle.
    pub fn new(raw: isize) -> Option<Self> {
        NonZeroIsize::new(raw).map(Self)
    }

    pub fn raw(self) -> isize {
        self.0.get()
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.raw())
    }
}

/// One row of a process snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Point-in-time view of the OS process table.
pub trait ProcessTable: Send + Sync {
    /// All live processes. An error means the table could not be listed at all.
    fn snapshot(&self) -> Result<Vec<ProcessEntry>>;

    /// Full path of the process image. May fail per process (access denied).
    fn module_path(&self, pid: u32) -> Result<PathBuf>;

    /// Primary top-level window of the process, if it has one.
    fn main_window(&self, pid: u32) -> Option<WindowHandle>;
}

/// Lowercases `name` and strips a trailing `suffix` if present.
pub fn comparison_key(name: &str, suffix: &str) -> String {
    let lower = name.to_lowercase();
    let suffix = suffix.to_lowercase();
    match lower.strip_suffix(&suffix) {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Key derived from the executable's filename; the suffix must be present.
fn executable_key(path: &Path, suffix: &str) -> Option<String> {
    let filename = path.file_name()?.to_string_lossy().to_lowercase();
    let index = filename.rfind(&suffix.to_lowercase())?;
    Some(filename[..index].to_string())
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

pub struct ProcessLocator<T: ProcessTable> {
    table: T,
    suffix: String,
}

impl<T: ProcessTable> ProcessLocator<T> {
    pub fn new(table: T, suffix: impl Into<String>) -> Self {
        Self {
            table,
            suffix: suffix.into(),
        }
    }

    /// Finds the window of a process running exactly `executable`.
    ///
    /// When several processes match, the last one in enumeration order that
    /// owns a window wins.
    pub fn locate_window(&self, executable: &ExecutablePath) -> Option<WindowHandle> {
        let path = executable.as_path();
        if path.as_os_str().is_empty() {
            error!("Executable path not provided; cannot locate target");
            return None;
        }

        info!(path = %executable, "Checking for running target process");

        if !path.is_file() {
            error!(path = %executable, "Executable no longer exists");
            return None;
        }

        let Some(key) = executable_key(path, &self.suffix) else {
            warn!(
                path = %executable,
                suffix = %self.suffix,
                "Executable name lacks suffix; it cannot be matched against running processes"
            );
            return None;
        };
        let full_path = absolutize(path);

        let entries = match self.table.snapshot() {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "Failed to enumerate processes");
                return None;
            }
        };

        debug!(count = entries.len(), key = %key, "Scanning process table");

        let mut found: Option<(u32, WindowHandle)> = None;
        for entry in entries {
            if comparison_key(&entry.name, &self.suffix) != key {
                continue;
            }

            info!(pid = entry.pid, name = %entry.name, "Found candidate process");

            let module = match self.table.module_path(entry.pid) {
                Ok(module) => module,
                Err(err) => {
                    warn!(pid = entry.pid, error = %err, "Could not read candidate module path");
                    continue;
                }
            };

            if module != full_path {
                debug!(pid = entry.pid, module = %module.display(), "Candidate path differs");
                continue;
            }

            match self.table.main_window(entry.pid) {
                Some(handle) => {
                    if let Some((previous, _)) = found {
                        warn!(previous, pid = entry.pid, "Several processes match; using the later one");
                    }
                    info!(pid = entry.pid, handle = %handle, "Candidate matches executable path");
                    found = Some((entry.pid, handle));
                }
                None => debug!(pid = entry.pid, "Matching process has no main window yet"),
            }
        }

        found.map(|(_, handle)| handle)
    }
}

/// [`ProcessTable`] backed by `sysinfo`, with platform window lookup.
pub struct SystemProcessTable {
    system: Mutex<System>,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Windows reads image paths on demand in `module_path`.
#[cfg(windows)]
fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new()
}

/// Re-read every time; a reused pid must not keep a stale exe path.
#[cfg(not(windows))]
fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::new().with_exe(UpdateKind::Always)
}

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        let mut sys = self
            .system
            .lock()
            .map_err(|err| AdguardError::ProcessListUnavailable(err.to_string()))?;
        sys.refresh_processes_specifics(refresh_kind());

        Ok(sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                name: process.name().to_string(),
            })
            .collect())
    }

    fn module_path(&self, pid: u32) -> Result<PathBuf> {
        #[cfg(windows)]
        {
            platform::win32::query_process_path(pid)
        }
        #[cfg(not(windows))]
        {
            let sys = self
                .system
                .lock()
                .map_err(|err| AdguardError::ProcessListUnavailable(err.to_string()))?;
            sys.process(sysinfo::Pid::from_u32(pid))
                .and_then(|process| process.exe())
                .map(Path::to_path_buf)
                .ok_or_else(|| AdguardError::ModulePathUnreadable {
                    pid,
                    details: "executable path not visible".to_string(),
                })
        }
    }

    fn main_window(&self, pid: u32) -> Option<WindowHandle> {
        platform::main_window(pid)
    }
}
