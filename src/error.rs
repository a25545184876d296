//! Error types for logger initialization and sink failures.
//!
//! Display text never includes the log file path or other environment details;
//! each message names the category of the problem and a remediation hint.

use thiserror::Error;

/// Failure while acquiring the log file during initialization.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("log file path must be absolute; pass a full path to the log file")]
    RelativePath,

    #[error("cannot create the log directory; check that the parent directory exists and is writable")]
    DirectoryCreate(#[source] std::io::Error),

    #[error("log file is a symbolic link; point the logger at a regular file instead")]
    Symlink,

    #[error("log file is not a regular file; choose a path that is not a directory or device")]
    NotRegularFile,

    #[error("log file is not writable; check the file permissions")]
    NotWritable,

    #[error("log file changed while it was being opened; retry once the path is stable")]
    Replaced,

    #[error("cannot open the log file; check the path and permissions")]
    Open(#[source] std::io::Error),
}

/// Failure of a sink after initialization. A sink reports at most one of these
/// and then stops writing.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("console output failed, console logging disabled: {0}")]
    Console(#[source] std::io::Error),

    #[error("writing to the log file failed, file logging disabled (check free disk space and permissions): {0}")]
    File(#[source] std::io::Error),

    #[error("journal helper failed, journal logging disabled (check the system logging service): {0}")]
    Journal(#[source] std::io::Error),
}

/// Rejected input to a runtime setter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("format template must not be empty")]
    EmptyTemplate,

    #[error("format template must not contain control characters or escape sequences")]
    UnsafeTemplate,

    #[error("journal tag must contain at least one of [A-Za-z0-9._-]")]
    InvalidTag,
}
