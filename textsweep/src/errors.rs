/// Error types for textsweep.
///
/// Errors fall into three groups, and the group decides how far an error travels:
///
/// 1. **Setup errors** (`DirectoryNotFound`, `InvalidWorkerCount`, `TooManyWorkers`, ...)
///    are detected before any work is dispatched and returned to the caller untouched.
/// 2. **Per-item faults** never become a `SweepError` at all. A file that cannot be read,
///    a converter that fails or a worker process that dies is turned into a `Failed`
///    [`OperationResult`](crate::results::OperationResult) at the worker boundary.
/// 3. **Fatal errors** (`PoolCreation`, an `IoError` while listing the directory) abort
///    the batch. The pool is still torn down before the error reaches the caller.
///
/// ```rust,ignore
/// match runner.search(dir, workers, params, &mut out) {
///     Ok(summary) => // print summary,
///     Err(SweepError::DirectoryNotFound(path)) => // tell the user,
///     Err(e) => // anything else
/// }
/// ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for textsweep operations
pub type SweepResult<T> = Result<T, SweepError>;

/// Errors that can occur while preparing or running a batch
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("The number of workers must be greater than 0")]
    InvalidWorkerCount,
    #[error("Cannot allocate more than ({available}) workers on this system, requested ({requested})")]
    TooManyWorkers { requested: usize, available: usize },
    #[error("Invalid worker argument: {0}")]
    InvalidWorkerArgument(String),
    #[error("Confidence score must be between 0 and 1, got {0}")]
    InvalidScore(String),
    #[error("Invalid search method: {0}")]
    InvalidMethod(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Failed to create worker pool: {0}")]
    PoolCreation(String),
    #[error("Worker protocol error: {0}")]
    WorkerProtocol(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl SweepError {
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DirectoryNotFound(path.into())
    }

    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        Self::NotADirectory(path.into())
    }

    pub fn too_many_workers(requested: usize, available: usize) -> Self {
        Self::TooManyWorkers {
            requested,
            available,
        }
    }

    pub fn invalid_worker_argument(arg: impl Into<String>) -> Self {
        Self::InvalidWorkerArgument(arg.into())
    }

    pub fn invalid_score(score: impl Into<String>) -> Self {
        Self::InvalidScore(score.into())
    }

    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod(method.into())
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn pool_creation(msg: impl Into<String>) -> Self {
        Self::PoolCreation(msg.into())
    }

    pub fn worker_protocol(msg: impl Into<String>) -> Self {
        Self::WorkerProtocol(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Maps a failed `read_dir` on `path` to the error the caller should see
    pub fn from_listing(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::directory_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::directory_not_found(path),
            _ if path.is_file() => Self::not_a_directory(path),
            _ => Self::IoError(err),
        }
    }

    /// True for errors detected before any work was dispatched
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound(_)
                | Self::NotADirectory(_)
                | Self::InvalidWorkerCount
                | Self::TooManyWorkers { .. }
                | Self::InvalidWorkerArgument(_)
                | Self::InvalidScore(_)
                | Self::InvalidMethod(_)
                | Self::InvalidPath(_)
        )
    }
}
