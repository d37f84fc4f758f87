//! Hook execution around the backup and restore workflows

use async_trait::async_trait;
use std::path::PathBuf;
use stowage_core::{Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Runs one hook command line.
///
/// A command that cannot be started or exits non-zero is an [`Error::Hook`].
#[async_trait]
pub trait HookRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<()>;
}

/// Runs hooks with `sh -c` from the workspace root
#[derive(Debug, Clone)]
pub struct ShellHookRunner {
    working_dir: PathBuf,
}

impl ShellHookRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl HookRunner for ShellHookRunner {
    async fn run(&self, command: &str) -> Result<()> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|e| Error::Hook {
                command: command.to_string(),
                status: None,
                stderr: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{}: {}", command, stdout.trim());
        }

        if !output.status.success() {
            return Err(Error::Hook {
                command: command.to_string(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }
}

/// Runs `commands` in order, stopping at the first failure.
pub async fn run_hooks(runner: &dyn HookRunner, commands: &[String], stage: &str) -> Result<()> {
    for command in commands {
        info!("Running {} hook: {}", stage, command);
        runner.run(command).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let temp = TempDir::new().unwrap();
        let runner = ShellHookRunner::new(temp.path());

        runner.run("echo hi > marker.txt").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(temp.path().join("marker.txt")).unwrap(),
            "hi\n"
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_hook_error() {
        let temp = TempDir::new().unwrap();
        let runner = ShellHookRunner::new(temp.path());

        let err = runner.run("echo nope >&2; exit 3").await.unwrap_err();
        match err {
            Error::Hook {
                command,
                status,
                stderr,
            } => {
                assert_eq!(command, "echo nope >&2; exit 3");
                assert_eq!(status, Some(3));
                assert_eq!(stderr.trim(), "nope");
            }
            other => panic!("expected hook error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_hooks_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let runner = ShellHookRunner::new(temp.path());
        let commands = vec![
            "touch one".to_string(),
            "false".to_string(),
            "touch two".to_string(),
        ];

        assert!(run_hooks(&runner, &commands, "pre-backup").await.is_err());
        assert!(temp.path().join("one").exists());
        assert!(!temp.path().join("two").exists());
    }
}
