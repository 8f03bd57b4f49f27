//! Locates the target executable.
//!
//! Sources are tried in priority order and the first hit wins:
//!
//! 1. [`RegistrySource`]: the protocol handler's `shell\open\command` value,
//!    e.g. `"C:\Program Files\Kakao\KakaoTalk\KakaoTalk.exe" "%1"`.
//! 2. [`CoLocatedSource`]: a well-known filename in the working directory.
//!
//! A source that fails logs why and yields `None`; only the resolver as a
//! whole reports "not found".

use crate::config::TargetConfig;
use crate::error::Result;
use crate::patterns::RE_QUOTED_TOKEN;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Filesystem path of the target executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutablePath(PathBuf);

impl ExecutablePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ExecutablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Read-only access to `HKEY_CLASSES_ROOT`.
///
/// Implementations must release any key handle they open before returning.
pub trait RegistryReader: Send + Sync {
    /// Default value of `subkey`, or `Ok(None)` when the key doesn't exist.
    fn read_default_value(&self, subkey: &str) -> Result<Option<String>>;
}

/// One place the executable might be found.
pub trait PathSource: Send + Sync {
    /// Short identifier used in logs and diagnostics.
    fn id(&self) -> &'static str;

    /// Should NOT panic or error - return None on any failure.
    fn find(&self) -> Option<ExecutablePath>;
}

/// Returns the first quoted token of `command` that contains `suffix`.
///
/// Matching is case-insensitive and empty tokens (`""`) are skipped.
pub fn extract_executable_from_command(command: &str, suffix: &str) -> Option<String> {
    let suffix = suffix.to_lowercase();
    RE_QUOTED_TOKEN
        .captures_iter(command)
        .filter_map(|captures| captures.get(1))
        .map(|token| token.as_str())
        .find(|token| !token.is_empty() && token.to_lowercase().contains(&suffix))
        .map(str::to_string)
}

pub struct RegistrySource<R: RegistryReader> {
    reader: R,
    subkey: String,
    suffix: String,
}

impl<R: RegistryReader> RegistrySource<R> {
    pub fn new(reader: R, target: &TargetConfig) -> Self {
        Self {
            reader,
            subkey: target.command_key(),
            suffix: target.suffix.clone(),
        }
    }
}

impl<R: RegistryReader> PathSource for RegistrySource<R> {
    fn id(&self) -> &'static str {
        "registry"
    }

    fn find(&self) -> Option<ExecutablePath> {
        let command = match self.reader.read_default_value(&self.subkey) {
            Ok(Some(command)) => command,
            Ok(None) => {
                warn!(key = %self.subkey, "Protocol handler registry key not found");
                return None;
            }
            Err(err) => {
                warn!(key = %self.subkey, error = %err, "Failed to read protocol handler key");
                return None;
            }
        };

        info!(key = %self.subkey, value = %command, "Protocol handler command found");

        let Some(extracted) = extract_executable_from_command(&command, &self.suffix) else {
            warn!(value = %command, "Failed to extract executable path from registry value");
            return None;
        };

        let path = PathBuf::from(&extracted);
        if !path.is_file() {
            warn!(path = %path.display(), "Registry points at a missing executable");
            return None;
        }

        info!(path = %path.display(), "Executable path extracted from registry");
        Some(ExecutablePath::new(path))
    }
}

/// Looks for the executable next to us.
pub struct CoLocatedSource {
    /// `None` means the working directory at lookup time.
    dir: Option<PathBuf>,
    filename: String,
}

impl CoLocatedSource {
    /// Checks the current working directory; a hit is returned as an
    /// absolute path.
    pub fn working_dir(filename: impl Into<String>) -> Self {
        Self {
            dir: None,
            filename: filename.into(),
        }
    }

    pub fn in_dir(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: Some(dir.into()),
            filename: filename.into(),
        }
    }

    fn search_dir(&self) -> Option<PathBuf> {
        match &self.dir {
            Some(dir) => Some(dir.clone()),
            None => match std::env::current_dir() {
                Ok(dir) => Some(dir),
                Err(err) => {
                    warn!(error = %err, "Working directory unavailable");
                    None
                }
            },
        }
    }
}

impl PathSource for CoLocatedSource {
    fn id(&self) -> &'static str {
        "co_located"
    }

    fn find(&self) -> Option<ExecutablePath> {
        let candidate = self.search_dir()?.join(&self.filename);
        if candidate.is_file() {
            info!(path = %candidate.display(), "Executable found alongside adguard");
            Some(ExecutablePath::new(candidate))
        } else {
            warn!(path = %candidate.display(), "Executable not found in working directory");
            None
        }
    }
}

/// Priority chain of [`PathSource`]s.
pub struct PathResolver {
    sources: Vec<Box<dyn PathSource>>,
}

impl PathResolver {
    pub fn new(sources: Vec<Box<dyn PathSource>>) -> Self {
        Self { sources }
    }

    /// Registry first, then the working directory.
    pub fn standard<R: RegistryReader + 'static>(reader: R, target: &TargetConfig) -> Self {
        Self::new(vec![
            Box::new(RegistrySource::new(reader, target)),
            Box::new(CoLocatedSource::working_dir(target.executable.clone())),
        ])
    }

    pub fn resolve(&self) -> Option<ExecutablePath> {
        for source in &self.sources {
            if let Some(path) = source.find() {
                debug!(source = source.id(), path = %path, "Executable path resolved");
                return Some(path);
            }
        }
        None
    }

    /// Every source's answer, in order. Used by diagnostics.
    pub fn probe_sources(&self) -> Vec<(&'static str, Option<ExecutablePath>)> {
        self.sources
            .iter()
            .map(|source| (source.id(), source.find()))
            .collect()
    }
}
