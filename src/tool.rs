//! Subprocess wrapper around the `genezio` CLI.

use crate::{Error, ProjectConfiguration};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::process::Command;

pub const DEFAULT_PROGRAM: &str = "genezio";

#[derive(Debug, Clone)]
pub struct DeploymentTool {
    program: OsString,
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl Default for DeploymentTool {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl DeploymentTool {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            current_dir: None,
            envs: Vec::new(),
        }
    }

    /// Sets the working directory every subcommand runs in.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    /// Adds an environment variable to every subcommand, on top of the inherited environment.
    pub fn env(mut self, key: impl Into<OsString>, val: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), val.into()));
        self
    }

    /// `genezio account`, fails when the CLI is not logged in.
    pub async fn account(&self) -> crate::Result<ToolOutput> {
        self.run(&["account"]).await
    }

    pub async fn deploy(&self, config: &ProjectConfiguration) -> crate::Result<ToolOutput> {
        tracing::info!(project = %config.name, region = %config.region, "deploying");
        self.run(&["deploy"]).await
    }

    pub async fn delete(
        &self,
        config: &ProjectConfiguration,
        project_id: &str,
    ) -> crate::Result<ToolOutput> {
        if project_id.is_empty() {
            return Err(Error::Msg("cannot delete a project with an empty id".into()));
        }
        tracing::info!(project = %config.name, id = project_id, "deleting");
        self.run(&["delete", project_id, "--force"]).await
    }

    fn display(&self, args: &[&str]) -> String {
        let mut s = self.program.to_string_lossy().into_owned();
        for arg in args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }

    async fn run(&self, args: &[&str]) -> crate::Result<ToolOutput> {
        let command = self.display(args);
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(%command, "running");
        let output = cmd
            .output()
            .await
            .map_err(|source| Error::ToolSpawn {
                command: command.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::debug!(%command, status = %output.status, %stdout, %stderr, "finished");

        if output.status.success() {
            Ok(ToolOutput { stdout, stderr })
        } else {
            Err(Error::Tool {
                command,
                status: output.status,
                stderr,
            })
        }
    }
}
