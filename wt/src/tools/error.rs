//! Tool error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during tool execution
///
/// None of these cross the tool boundary: every tool renders them into an
/// error `ToolResult` (see `impl From<ToolError> for ToolResult`).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{arg} must be an absolute path, got {path}")]
    InvalidPath { arg: &'static str, path: String },

    #[error("{arg} must be inside the workspace root directory. ROOT={}, got={}", root.display(), path.display())]
    OutOfSandbox {
        arg: &'static str,
        path: PathBuf,
        root: PathBuf,
    },

    #[error("path does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("path is not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("path is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("parent path is not a directory: {}", path.display())]
    ParentNotDirectory { path: PathBuf },

    #[error("old_content not found in file")]
    PatternNotFound,

    #[error(
        "old_content found {count} times in file, expected exactly 1. Include more surrounding context so it is unique"
    )]
    PatternNotUnique { count: usize },

    #[error("The Command `{command}` timed out after {timeout_secs} seconds")]
    CommandTimeout { command: String, timeout_secs: u64 },

    #[error("failed to execute command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    MalformedInput(String),

    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("background task failed: {0}")]
    Worker(String),
}

impl ToolError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
