//! Error types for the binfmt registration manager.
//!
//! Every failure a single install or uninstall item can hit has its own
//! variant so callers can report it per item and keep going. Only mount
//! failures are fatal for a whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for binfmt operations.
#[derive(Debug, Error)]
pub enum BinfmtError {
    // Per-item errors
    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("{name} already registered")]
    AlreadyRegistered { name: String },

    #[error("not found")]
    NotFound { target: String },

    #[error("cannot register {interpreter:?} to {}: {source} (record {record})", path.display())]
    Registration {
        name: String,
        interpreter: PathBuf,
        path: PathBuf,
        record: String,
        #[source]
        source: std::io::Error,
    },

    // Kernel interface errors
    #[error("ENOENT opening {} is it mounted?", path.display())]
    MountUnavailable { path: PathBuf },

    #[error("EPERM opening {} check permissions?", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("cannot mount binfmt_misc filesystem at {}: {source}", path.display())]
    Mount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("invalid platform specifier {spec:?}: {reason}")]
    InvalidPlatform { spec: String, reason: String },
}

/// Result type alias for binfmt operations.
pub type Result<T> = std::result::Result<T, BinfmtError>;

impl From<std::io::Error> for BinfmtError {
    fn from(err: std::io::Error) -> Self {
        BinfmtError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BinfmtError {
    fn from(err: serde_json::Error) -> Self {
        BinfmtError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BinfmtError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BinfmtError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether no further operation is meaningful after this error.
    ///
    /// A missing or unmountable filesystem makes every later install and
    /// uninstall fail the same way, so the run stops.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BinfmtError::Mount { .. })
    }
}
