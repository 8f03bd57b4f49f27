//! End-to-end supervision scenarios against in-memory process tables.

use adguard_core::{
    extract_executable_from_command, AdguardError, CoLocatedSource, CommandLauncher,
    ExecutablePath, Launcher, PathResolver, Presenter, ProbeOutcome, ProcessEntry, ProcessLocator, ProcessTable,
    RegistryReader, RegistrySource, Result, StatusMessage, Step, SuppressionProbe, Supervisor,
    TargetConfig, TimingConfig, WindowHandle,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct StaticRegistry(Option<String>);

impl RegistryReader for StaticRegistry {
    fn read_default_value(&self, _subkey: &str) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Clone, Default)]
struct Table {
    rows: Arc<Mutex<Vec<(ProcessEntry, Option<PathBuf>, isize)>>>,
}

impl Table {
    fn add(&self, pid: u32, name: &str, path: Option<&Path>, window: isize) {
        self.rows.lock().unwrap().push((
            ProcessEntry {
                pid,
                name: name.to_string(),
            },
            path.map(Path::to_path_buf),
            window,
        ));
    }
}

impl ProcessTable for Table {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(entry, _, _)| entry.clone())
            .collect())
    }

    fn module_path(&self, pid: u32) -> Result<PathBuf> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|(entry, _, _)| entry.pid == pid)
            .and_then(|(_, path, _)| path.clone())
            .ok_or_else(|| AdguardError::ModulePathUnreadable {
                pid,
                details: "Access is denied".to_string(),
            })
    }

    fn main_window(&self, pid: u32) -> Option<WindowHandle> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|(entry, _, _)| entry.pid == pid)
            .and_then(|(_, _, window)| WindowHandle::new(*window))
    }
}

#[derive(Clone, Default)]
struct Launches {
    count: Arc<Mutex<usize>>,
    fail: bool,
}

impl Launcher for Launches {
    fn launch(&self, executable: &ExecutablePath) -> Result<()> {
        *self.count.lock().unwrap() += 1;
        if self.fail {
            return Err(AdguardError::LaunchFailed {
                path: executable.as_path().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            });
        }
        Ok(())
    }
}

struct AlwaysClear;

impl SuppressionProbe for AlwaysClear {
    fn close_ads(&self, _window: WindowHandle) -> ProbeOutcome {
        ProbeOutcome::Clear
    }
}

#[derive(Clone, Default)]
struct Statuses(Arc<Mutex<Vec<StatusMessage>>>);

impl Statuses {
    fn last(&self) -> Option<StatusMessage> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl Presenter for Statuses {
    fn show_status(&self, status: StatusMessage) {
        self.0.lock().unwrap().push(status);
    }

    fn progress_complete(&self) {}

    fn move_to_background(&self) {}
}

fn supervisor(
    resolver: PathResolver,
    table: Table,
    launches: Launches,
    statuses: Statuses,
) -> Supervisor<Table> {
    Supervisor::new(
        resolver,
        ProcessLocator::new(table, ".exe"),
        Box::new(launches),
        Box::new(AlwaysClear),
        Box::new(statuses),
        TimingConfig::default(),
    )
}

fn install_target(dir: &Path) -> PathBuf {
    let exe = dir.join("Foo.exe");
    fs_err::write(&exe, b"").unwrap();
    exe
}

#[test]
fn test_registry_hit_with_running_target_enters_suppressing() {
    let dir = tempfile::tempdir().unwrap();
    let exe = install_target(dir.path());
    let command = format!("\"{}\" \"%1\"", exe.display());
    let resolver = PathResolver::new(vec![Box::new(RegistrySource::new(
        StaticRegistry(Some(command)),
        &TargetConfig::default(),
    ))]);
    assert_eq!(resolver.resolve(), Some(ExecutablePath::new(&exe)));

    let table = Table::default();
    table.add(300, "Foo", Some(&exe), 0x1001);
    let launches = Launches::default();
    let mut supervisor = supervisor(resolver, table, launches.clone(), Statuses::default());

    supervisor.step();
    supervisor.step();

    assert!(matches!(supervisor.state().step, Step::Suppressing { .. }));
    assert_eq!(supervisor.state().step.window(), WindowHandle::new(0x1001));
    assert_eq!(*launches.count.lock().unwrap(), 0);
}

#[test]
fn test_nothing_installed_stays_locating_with_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = PathResolver::new(vec![
        Box::new(RegistrySource::new(
            StaticRegistry(None),
            &TargetConfig::default(),
        )),
        Box::new(CoLocatedSource::in_dir(dir.path(), "KakaoTalk.exe")),
    ]);
    let statuses = Statuses::default();
    let mut supervisor = supervisor(
        resolver,
        Table::default(),
        Launches::default(),
        statuses.clone(),
    );

    for _ in 0..5 {
        supervisor.step();
        assert_eq!(supervisor.state().step, Step::Locating);
    }
    assert_eq!(statuses.last(), Some(StatusMessage::InstallationNotFound));
}

#[test]
fn test_registry_without_executable_falls_back_to_co_located() {
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("KakaoTalk.exe");
    fs_err::write(&exe, b"").unwrap();
    let resolver = PathResolver::new(vec![
        Box::new(RegistrySource::new(
            StaticRegistry(Some(r#""%1" /open"#.to_string())),
            &TargetConfig::default(),
        )),
        Box::new(CoLocatedSource::in_dir(dir.path(), "KakaoTalk.exe")),
    ]);

    assert_eq!(resolver.resolve(), Some(ExecutablePath::new(exe)));
}

#[test]
fn test_denied_candidate_does_not_hide_later_match() {
    let dir = tempfile::tempdir().unwrap();
    let exe = install_target(dir.path());
    let table = Table::default();
    table.add(1, "foo.exe", None, 0x11);
    table.add(2, "Foo.exe", Some(Path::new("/other/Foo.exe")), 0x22);
    table.add(3, "FOO.EXE", Some(&exe), 0x33);

    let locator = ProcessLocator::new(table, ".exe");
    assert_eq!(
        locator.locate_window(&ExecutablePath::new(&exe)),
        WindowHandle::new(0x33)
    );
}

#[test]
fn test_launch_failure_stalls_awaiting_process() {
    let dir = tempfile::tempdir().unwrap();
    let exe = install_target(dir.path());
    let resolver = PathResolver::new(vec![Box::new(CoLocatedSource::in_dir(
        dir.path(),
        "Foo.exe",
    ))]);
    let launches = Launches {
        fail: true,
        ..Launches::default()
    };
    let statuses = Statuses::default();
    let mut supervisor = supervisor(
        resolver,
        Table::default(),
        launches.clone(),
        statuses.clone(),
    );

    for _ in 0..6 {
        supervisor.step();
    }

    assert_eq!(
        supervisor.state().step,
        Step::AwaitingProcess {
            path: ExecutablePath::new(exe)
        }
    );
    assert!(supervisor.state().launch_failed);
    assert_eq!(*launches.count.lock().unwrap(), 1);
    assert_eq!(statuses.last(), Some(StatusMessage::LaunchFailed));
}

#[test]
fn test_open_command_yields_unquoted_path() {
    assert_eq!(
        extract_executable_from_command(r#""C:\Apps\Foo\Foo.exe" "%1""#, ".exe").as_deref(),
        Some(r"C:\Apps\Foo\Foo.exe")
    );
}

#[cfg(unix)]
#[test]
fn test_working_dir_executable_can_be_launched() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("Foo.exe");
    fs_err::write(&exe, "#!/bin/sh\ntouch launched\n").unwrap();
    fs_err::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    let original_dir = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let resolver = PathResolver::new(vec![Box::new(CoLocatedSource::working_dir("Foo.exe"))]);
    let resolved = resolver.resolve();
    std::env::set_current_dir(original_dir).unwrap();

    let resolved = resolved.unwrap();
    assert!(resolved.as_path().is_absolute());

    CommandLauncher.launch(&resolved).unwrap();

    let marker = dir.path().join("launched");
    let started = Instant::now();
    while !marker.exists() && started.elapsed() < Duration::from_secs(10) {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(marker.exists());
}
