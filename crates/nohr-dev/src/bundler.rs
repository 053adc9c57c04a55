//! Bundler seam
//!
//! The bundler itself is an external program. The dev loop only asks it to
//! build one of two targets and looks at the exit status.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use crate::config::CommandsConfig;
use crate::error::{DevError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    Client,
    Server,
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTarget::Client => f.write_str("client"),
            BuildTarget::Server => f.write_str("server"),
        }
    }
}

/// Something that can produce a client or server bundle
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Builds `target`; a failure carries the bundler's diagnostics
    async fn build(&self, target: BuildTarget) -> Result<()>;
}

/// Runs one configured command per target
#[derive(Debug, Clone)]
pub struct CommandBundler {
    client: Vec<String>,
    server: Vec<String>,
    cwd: PathBuf,
}

impl CommandBundler {
    pub fn new(client: Vec<String>, server: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            client,
            server,
            cwd: cwd.into(),
        }
    }

    pub fn from_config(commands: &CommandsConfig, cwd: impl Into<PathBuf>) -> Self {
        Self::new(
            commands.client_build.clone(),
            commands.server_build.clone(),
            cwd,
        )
    }

    fn command_for(&self, target: BuildTarget) -> &[String] {
        match target {
            BuildTarget::Client => &self.client,
            BuildTarget::Server => &self.server,
        }
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn build(&self, target: BuildTarget) -> Result<()> {
        let Some((program, args)) = self.command_for(target).split_first() else {
            tracing::debug!("No {} build command configured, skipping", target);
            return Ok(());
        };

        tracing::info!("Building {}...", target);
        let started = std::time::Instant::now();

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DevError::Build {
                target,
                message: format!("could not run `{}`: {}", program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("`{}` exited with {}", program, output.status)
            } else {
                stderr
            };
            return Err(DevError::Build { target, message });
        }

        tracing::info!("{} build completed in {:?}", target, started.elapsed());
        Ok(())
    }
}
