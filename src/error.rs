//! Error types for the extraction pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for exif-extract operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Everything that can stop a report from being produced.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The root path could not be stat'ed or a directory could not be listed.
    #[error("Filesystem error at {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata decoder rejected a file.
    #[error("Failed to parse metadata from {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// A decoded value is outside what the report can represent.
    #[error("File {path} {message}")]
    Data { path: String, message: String },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Writing the report failed.
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    /// A worker task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl ExtractError {
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn data(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Data {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error kind, used in failure summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileSystem { .. } => "filesystem",
            Self::Parse { .. } => "parse",
            Self::Data { .. } => "data",
            Self::Config { .. } => "config",
            Self::Io(_) => "io",
            Self::Task(_) => "task",
        }
    }
}

impl From<tokio::task::JoinError> for ExtractError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
