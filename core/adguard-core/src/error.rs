//! Error types for adguard-core operations.
//! Every variant here is recoverable from the supervisor's point of view.

use std::path::PathBuf;

/// All errors that can occur in adguard-core operations.
///
/// The supervisor never propagates these past a step boundary; they are
/// logged and mapped onto a status or a retry.
#[derive(Debug, thiserror::Error)]
pub enum AdguardError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Config directory not found")]
    ConfigDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("No suppression probe program configured")]
    ProbeNotConfigured,

    // ─────────────────────────────────────────────────────────────────────
    // Discovery Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Registry read failed: {key}: {details}")]
    RegistryReadFailed { key: String, details: String },

    #[error("Process list unavailable: {0}")]
    ProcessListUnavailable(String),

    #[error("Module path unreadable for pid {pid}: {details}")]
    ModulePathUnreadable { pid: u32, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Action Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to launch {path}: {source}")]
    LaunchFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Suppression probe failed: {0}")]
    ProbeFailed(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using AdguardError.
pub type Result<T> = std::result::Result<T, AdguardError>;

impl From<AdguardError> for String {
    fn from(err: AdguardError) -> String {
        err.to_string()
    }
}
