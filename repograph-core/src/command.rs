//! Command-execution port
//!
//! Materialization, extraction and rendering shell out to external tools.
//! They do so through [`CommandRunner`] so tests can script the tools.

use crate::error::CommandError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub stdin: Option<String>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl From<&str> for CommandOutput {
    fn from(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }
}

/// Runs external tools.
///
/// A non-zero exit status is reported as [`CommandError::Failed`] with the
/// captured output attached.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: CommandInvocation) -> Result<CommandOutput, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let cmd = CommandInvocation::new("goda")
            .arg("graph")
            .args(["-short", "./...:root"])
            .current_dir("/tmp/src")
            .stdin("input");

        assert_eq!(cmd.to_string(), "goda graph -short ./...:root");
        assert_eq!(cmd.current_dir.as_deref(), Some(Path::new("/tmp/src")));
        assert_eq!(cmd.stdin.as_deref(), Some("input"));
    }
}
