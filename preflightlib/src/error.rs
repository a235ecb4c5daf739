//! Error types for preflightlib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or running a preflight check
#[derive(Error, Debug)]
pub enum PreflightError {
    /// Path is not inside a git repository
    #[error("not a git repository: {0}")]
    NotGitRepo(PathBuf),

    /// A pre-commit hook is already installed
    #[error("pre-commit hook already exists: {0}")]
    PreCommitExists(PathBuf),

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Plugin specification could not be understood
    #[error("invalid plugin specification: {0}")]
    InvalidPlugin(String),

    /// Plugin payload could not be encoded
    #[error("failed to encode plugin payload: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git operation error
    #[error("git error: {0}")]
    GitError(String),
}
