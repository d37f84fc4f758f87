//! Remote host backend over ssh/scp
//!
//! Archives live in a directory on a remote host. The system `ssh` and `scp`
//! clients do the transport, so authentication follows the user's ssh setup
//! (agent, `~/.ssh/config`, or the configured identity file).

use crate::traits::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use stowage_core::types::RemoteStorageConfig;
use stowage_core::{Result, StorageError};
use tokio::process::Command;
use tracing::debug;

/// Exit status `test -e` uses for a missing path
const TEST_MISSING_STATUS: i32 = 1;

/// Stores archives in a directory on a remote host
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    destination: String,
    path: String,
    port: Option<u16>,
    identity: Option<PathBuf>,
}

impl RemoteBackend {
    /// Create a backend from configuration
    pub fn new(config: &RemoteStorageConfig) -> Self {
        Self {
            destination: config.destination(),
            path: config.path.trim_end_matches('/').to_string(),
            port: config.port,
            identity: config.ssh_credential_file.clone(),
        }
    }

    fn remote_path(&self, key: &str) -> String {
        format!("{}/{}", self.path, key)
    }

    /// Arguments for running `command` on the remote host with ssh
    fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(self.destination.clone());
        args.push(command.to_string());
        args
    }

    /// Arguments for copying `from` to `to` with scp
    fn scp_args(&self, from: String, to: String) -> Vec<String> {
        let mut args = vec!["-q".to_string(), "-B".to_string()];
        if let Some(port) = self.port {
            args.push("-P".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(from);
        args.push(to);
        args
    }

    fn remote_spec(&self, key: &str) -> String {
        format!("{}:{}", self.destination, self.remote_path(key))
    }

    async fn run(&self, program: &str, args: Vec<String>) -> Result<Output> {
        debug!("Running {} {}", program, args.join(" "));
        Command::new(program)
            .args(&args)
            .output()
            .await
            .map_err(|e| StorageError::transport(self.name(), format!("spawn {}: {}", program, e)).into())
    }

    fn failure(&self, program: &str, output: &Output) -> StorageError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        StorageError::transport(
            self.name(),
            format!("{} exited with {}: {}", program, output.status, stderr.trim()),
        )
    }
}

#[async_trait]
impl StorageBackend for RemoteBackend {
    fn name(&self) -> String {
        format!("remote:{}:{}", self.destination, self.path)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let command = format!("test -e {}", shell_quote(&self.remote_path(key)));
        let output = self.run("ssh", self.ssh_args(&command)).await?;

        match output.status.code() {
            Some(0) => Ok(true),
            Some(TEST_MISSING_STATUS) => Ok(false),
            _ => Err(self.failure("ssh", &output).into()),
        }
    }

    async fn upload(&self, key: &str, source: &Path) -> Result<()> {
        let mkdir = format!("mkdir -p {}", shell_quote(&self.path));
        let output = self.run("ssh", self.ssh_args(&mkdir)).await?;
        if !output.status.success() {
            return Err(self.failure("ssh", &output).into());
        }

        let args = self.scp_args(source.display().to_string(), self.remote_spec(key));
        let output = self.run("scp", args).await?;
        if !output.status.success() {
            return Err(self.failure("scp", &output).into());
        }

        debug!("Uploaded {} to {}", key, self.name());
        Ok(())
    }

    async fn download(&self, key: &str, destination: &Path) -> Result<()> {
        if !self.exists(key).await? {
            return Err(StorageError::not_found(key).into());
        }

        let args = self.scp_args(self.remote_spec(key), destination.display().to_string());
        let output = self.run("scp", args).await?;
        if !output.status.success() {
            return Err(self.failure("scp", &output).into());
        }

        debug!("Downloaded {} from {}", key, self.name());
        Ok(())
    }
}

/// Quote a string for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteStorageConfig {
        RemoteStorageConfig {
            host: "backup.example.com".to_string(),
            user: Some("backup".to_string()),
            path: "/srv/stowage/".to_string(),
            port: Some(2222),
            ssh_credential_file: Some(PathBuf::from("/home/me/.ssh/id_ed25519")),
        }
    }

    #[test]
    fn test_ssh_args() {
        let backend = RemoteBackend::new(&config());
        let args = backend.ssh_args("test -e '/srv/stowage/abc.tar.gz'");

        assert_eq!(
            args,
            vec![
                "-o",
                "BatchMode=yes",
                "-p",
                "2222",
                "-i",
                "/home/me/.ssh/id_ed25519",
                "backup@backup.example.com",
                "test -e '/srv/stowage/abc.tar.gz'",
            ]
        );
    }

    #[test]
    fn test_scp_args_use_uppercase_port_flag() {
        let backend = RemoteBackend::new(&config());
        let args = backend.scp_args("/tmp/a.tar.gz".to_string(), backend.remote_spec("a.tar.gz"));

        assert_eq!(args[2], "-P");
        assert_eq!(args[3], "2222");
        assert_eq!(
            args.last().unwrap(),
            "backup@backup.example.com:/srv/stowage/a.tar.gz"
        );
    }

    #[test]
    fn test_minimal_config_args() {
        let backend = RemoteBackend::new(&RemoteStorageConfig {
            host: "nas".to_string(),
            user: None,
            path: "backups".to_string(),
            port: None,
            ssh_credential_file: None,
        });

        assert_eq!(
            backend.ssh_args("true"),
            vec!["-o", "BatchMode=yes", "nas", "true"]
        );
        assert_eq!(backend.name(), "remote:nas:backups");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/srv/a b"), "'/srv/a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
