//! Error types for repograph operations

use std::time::Duration;
use thiserror::Error;

/// Cache store errors. Always non-fatal to a pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache write failed for {key}: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Errors from the command-execution port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

/// Coarse classification used for metrics labels and HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRepo,
    Resolution,
    Extraction,
    Render,
    Cache,
    Command,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRepo => "invalid_repo",
            ErrorKind::Resolution => "resolution",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Render => "render",
            ErrorKind::Cache => "cache",
            ErrorKind::Command => "command",
        }
    }
}

/// Master error type for all repograph errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepographError {
    #[error("Invalid repository {input:?}: {reason}")]
    InvalidRepo { input: String, reason: String },

    /// Source tree could not be obtained or verified.
    #[error("Cannot resolve source for {repo}: {reason}")]
    Resolution { repo: String, reason: String },

    /// Dependency graph tool failed or produced no usable output.
    #[error("Cannot extract graph for {repo}: {reason}")]
    Extraction { repo: String, reason: String },

    /// Layout tool failed.
    #[error("Cannot render graph: {reason}")]
    Render { reason: String },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

impl RepographError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepographError::InvalidRepo { .. } => ErrorKind::InvalidRepo,
            RepographError::Resolution { .. } => ErrorKind::Resolution,
            RepographError::Extraction { .. } => ErrorKind::Extraction,
            RepographError::Render { .. } => ErrorKind::Render,
            RepographError::Cache(_) => ErrorKind::Cache,
            RepographError::Command(_) => ErrorKind::Command,
        }
    }

    pub fn resolution(repo: impl ToString, reason: impl ToString) -> Self {
        RepographError::Resolution {
            repo: repo.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction(repo: impl ToString, reason: impl ToString) -> Self {
        RepographError::Extraction {
            repo: repo.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn render(reason: impl ToString) -> Self {
        RepographError::Render {
            reason: reason.to_string(),
        }
    }
}

/// Result type for repograph operations.
pub type RepographResult<T> = Result<T, RepographError>;
