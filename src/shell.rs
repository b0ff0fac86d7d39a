//! External process execution
//!
//! [`Shell::run`] is for commands that must succeed (clone, checkout): a
//! non-zero exit becomes [`Error::CommandFailed`]. [`Shell::run_unchecked`]
//! is for commands that may legitimately fail (pulling a detached ref,
//! updating submodules that don't exist) and hands back whatever happened.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs one executable inside a working directory
#[derive(Debug, Clone)]
pub struct Shell {
    working_dir: PathBuf,
    executable: String,
}

impl Shell {
    pub fn new(working_dir: impl Into<PathBuf>, executable: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            executable: executable.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run and fail unless the process exits with status 0
    pub async fn run(&self, args: &[&str]) -> Result<ProcessOutput> {
        let output = self.run_unchecked(args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                command: self.describe(args),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    /// Run and return the outcome whatever the exit status
    ///
    /// Only failing to start the process is an error.
    pub async fn run_unchecked(&self, args: &[&str]) -> Result<ProcessOutput> {
        debug!(
            "Running `{}` in {}",
            self.describe(args),
            self.working_dir.display()
        );

        let output = Command::new(&self.executable)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::Other(format!(
                    "Failed to run `{}`: {}",
                    self.describe(args),
                    e
                ))
            })?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.executable.as_str())
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_captures_output() {
        let temp_dir = TempDir::new().unwrap();
        let shell = Shell::new(temp_dir.path(), "sh");

        let output = shell.run(&["-c", "echo hello"]).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_uses_working_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("marker.txt"), "x").unwrap();
        let shell = Shell::new(temp_dir.path(), "sh");

        let output = shell.run(&["-c", "ls"]).await.unwrap();
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_run_fails_on_nonzero_exit() {
        let temp_dir = TempDir::new().unwrap();
        let shell = Shell::new(temp_dir.path(), "sh");

        let err = shell
            .run(&["-c", "echo broken >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            Error::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_unchecked_returns_failure() {
        let temp_dir = TempDir::new().unwrap();
        let shell = Shell::new(temp_dir.path(), "sh");

        let output = shell.run_unchecked(&["-c", "exit 1"]).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.code, Some(1));
    }

    #[tokio::test]
    async fn test_missing_executable_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let shell = Shell::new(temp_dir.path(), "definitely-not-a-real-binary-addonpm");

        assert!(shell.run_unchecked(&["--version"]).await.is_err());
    }
}
