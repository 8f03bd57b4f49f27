//! Scriptable fakes for the supervisor's seams.

use crate::error::{AdguardError, Result};
use crate::launcher::Launcher;
use crate::path_resolver::{ExecutablePath, PathSource};
use crate::presenter::{Presenter, StatusMessage};
use crate::probe::{ProbeOutcome, SuppressionProbe};
use crate::process::{ProcessEntry, ProcessTable, WindowHandle};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Path source whose answer can be changed mid-test.
#[derive(Clone, Default)]
pub struct FakeSource {
    pub path: Arc<Mutex<Option<ExecutablePath>>>,
}

impl FakeSource {
    pub fn set(&self, path: Option<ExecutablePath>) {
        *self.path.lock().unwrap() = path;
    }
}

impl PathSource for FakeSource {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn find(&self) -> Option<ExecutablePath> {
        self.path.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct TableRows {
    entries: Vec<ProcessEntry>,
    paths: HashMap<u32, PathBuf>,
    windows: HashMap<u32, isize>,
}

/// In-memory process table shared between the test and the locator.
#[derive(Clone, Default)]
pub struct FakeTable {
    rows: Arc<Mutex<TableRows>>,
}

impl FakeTable {
    pub fn add(&self, pid: u32, name: &str, path: impl Into<PathBuf>, window: isize) {
        let mut rows = self.rows.lock().unwrap();
        rows.entries.push(ProcessEntry {
            pid,
            name: name.to_string(),
        });
        rows.paths.insert(pid, path.into());
        rows.windows.insert(pid, window);
    }
}

impl ProcessTable for FakeTable {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        Ok(self.rows.lock().unwrap().entries.clone())
    }

    fn module_path(&self, pid: u32) -> Result<PathBuf> {
        self.rows
            .lock()
            .unwrap()
            .paths
            .get(&pid)
            .cloned()
            .ok_or_else(|| AdguardError::ModulePathUnreadable {
                pid,
                details: "Access is denied".into(),
            })
    }

    fn main_window(&self, pid: u32) -> Option<WindowHandle> {
        self.rows
            .lock()
            .unwrap()
            .windows
            .get(&pid)
            .copied()
            .and_then(WindowHandle::new)
    }
}

/// Records launches; optionally fails, optionally adds the process on launch.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub launches: Arc<Mutex<Vec<ExecutablePath>>>,
    pub fail: bool,
    pub spawn_into: Option<(FakeTable, u32, isize)>,
}

impl FakeLauncher {
    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, executable: &ExecutablePath) -> Result<()> {
        self.launches.lock().unwrap().push(executable.clone());
        if self.fail {
            return Err(AdguardError::LaunchFailed {
                path: executable.as_path().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        if let Some((table, pid, window)) = &self.spawn_into {
            let name = executable
                .as_path()
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            table.add(*pid, &name, executable.as_path(), *window);
        }
        Ok(())
    }
}

/// Replays queued outcomes, then repeats `fallback`.
#[derive(Clone)]
pub struct ScriptedProbe {
    pub queue: Arc<Mutex<VecDeque<ProbeOutcome>>>,
    pub fallback: ProbeOutcome,
    pub calls: Arc<Mutex<Vec<WindowHandle>>>,
}

impl ScriptedProbe {
    pub fn new(outcomes: Vec<ProbeOutcome>, fallback: ProbeOutcome) -> Self {
        Self {
            queue: Arc::new(Mutex::new(outcomes.into())),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, outcome: ProbeOutcome) {
        self.queue.lock().unwrap().push_back(outcome);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SuppressionProbe for ScriptedProbe {
    fn close_ads(&self, window: WindowHandle) -> ProbeOutcome {
        self.calls.lock().unwrap().push(window);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Status(StatusMessage),
    Complete,
    Background,
}

#[derive(Clone, Default)]
pub struct RecordingPresenter {
    pub events: Arc<Mutex<Vec<PresenterEvent>>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<StatusMessage> {
        self.events().into_iter().rev().find_map(|event| match event {
            PresenterEvent::Status(status) => Some(status),
            _ => None,
        })
    }
}

impl Presenter for RecordingPresenter {
    fn show_status(&self, status: StatusMessage) {
        self.events
            .lock()
            .unwrap()
            .push(PresenterEvent::Status(status));
    }

    fn progress_complete(&self) {
        self.events.lock().unwrap().push(PresenterEvent::Complete);
    }

    fn move_to_background(&self) {
        self.events.lock().unwrap().push(PresenterEvent::Background);
    }
}
