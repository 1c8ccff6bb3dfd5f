//! Control Client: synchronous execution of supervisorctl commands and
//! direct bootstrap of the supervisord daemon.
//!
//! Every call blocks until the subprocess has exited. A non-zero exit from
//! a control command is not an error here — callers branch on the captured
//! output text. Only a daemon bootstrap that fails, or a binary that cannot
//! be spawned at all, surfaces as [`Error::ControlExecution`].

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::Config;

use super::error::{Error, Result};

/// Output of one control command: captured stdout plus the exit code, if
/// the subprocess ran at all.
#[derive(Debug)]
pub struct CommandOutput {
    pub output: String,
    pub status: Option<i32>,
}

impl CommandOutput {
    /// True when the subprocess exited with status zero.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Client for the daemon's line-oriented control interface.
///
/// Knows two invocations: `supervisorctl [--configuration=<path>] <command>`
/// for control commands, and
/// `supervisord [--configuration=<path>] [--identifier=<name>]` to bootstrap
/// the daemon when the control socket is absent. Both run in the configured
/// application directory.
#[derive(Debug, Clone)]
pub struct Control {
    application_directory: PathBuf,
    configuration: Option<PathBuf>,
    identifier: Option<String>,
    control_binary: PathBuf,
    daemon_binary: PathBuf,
}

impl Control {
    pub fn new(
        application_directory: impl Into<PathBuf>,
        configuration: Option<PathBuf>,
        identifier: Option<String>,
    ) -> Self {
        Self {
            application_directory: application_directory.into(),
            configuration,
            identifier,
            control_binary: PathBuf::from("supervisorctl"),
            daemon_binary: PathBuf::from("supervisord"),
        }
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            application_directory: config.daemon.application_directory.clone(),
            configuration: Some(config.paths.configuration_file.clone()),
            identifier: Some(config.daemon.identifier.clone()),
            control_binary: config.daemon.supervisorctl.clone(),
            daemon_binary: config.daemon.supervisord.clone(),
        }
    }

    /// Runs a single control command and captures its output.
    ///
    /// Blocks until the subprocess exits. Does not fail on non-zero exit;
    /// fails only when the control binary cannot be spawned.
    pub fn execute(&self, command: &str) -> Result<CommandOutput> {
        let mut invocation = Command::new(&self.control_binary);
        invocation.current_dir(&self.application_directory);
        if let Some(configuration) = &self.configuration {
            invocation.arg(format!("--configuration={}", configuration.display()));
        }
        invocation.arg(command);

        tracing::debug!(
            binary = %self.control_binary.display(),
            command,
            "executing control command"
        );

        let captured = invocation.output().map_err(|source| Error::ControlExecution {
            command: command.to_string(),
            status: None,
            output: source.to_string(),
        })?;

        let output = String::from_utf8_lossy(&captured.stdout).into_owned();
        let status = captured.status.code();
        tracing::debug!(command, status, "control command finished");

        Ok(CommandOutput { output, status })
    }

    /// Starts the daemon if the control socket probe says it is absent.
    ///
    /// Safe to call when the daemon is already running: a reachable socket
    /// produces no absence marker and nothing is spawned.
    pub fn ensure_running(&self) -> Result<()> {
        let status = self.execute("status")?;
        if !socket_unreachable(&status.output) {
            tracing::debug!("supervisord already reachable");
            return Ok(());
        }

        let mut invocation = Command::new(&self.daemon_binary);
        invocation.current_dir(&self.application_directory);
        if let Some(configuration) = &self.configuration {
            invocation.arg(format!("--configuration={}", configuration.display()));
        }
        if let Some(identifier) = &self.identifier {
            invocation.arg(format!("--identifier={identifier}"));
        }

        tracing::info!(
            binary = %self.daemon_binary.display(),
            "control socket unreachable, launching supervisord"
        );

        let command = self.daemon_binary.display().to_string();
        let captured = invocation.output().map_err(|source| Error::ControlExecution {
            command: command.clone(),
            status: None,
            output: source.to_string(),
        })?;

        if !captured.status.success() {
            let mut output = String::from_utf8_lossy(&captured.stdout).into_owned();
            output.push_str(&String::from_utf8_lossy(&captured.stderr));
            return Err(Error::ControlExecution {
                command,
                status: captured.status.code(),
                output,
            });
        }

        Ok(())
    }

    /// Tells a running daemon to re-read its configuration and apply the
    /// result: `reread` then `update`, both awaited to completion.
    pub fn reload_and_apply(&self) -> Result<()> {
        self.execute("reread")?;
        self.execute("update")?;
        Ok(())
    }

    /// Returns the daemon's status output verbatim; parsing is a caller
    /// concern.
    pub fn query_status(&self) -> Result<String> {
        Ok(self.execute("status")?.output)
    }

    pub fn application_directory(&self) -> &Path {
        &self.application_directory
    }
}

/// Classifies supervisorctl status output as "control socket unreachable".
///
/// The control utility reports an absent socket as `... no such file` and a
/// dead-but-present socket as `... refused connection`; any other output
/// means the daemon answered.
pub fn socket_unreachable(status_output: &str) -> bool {
    status_output.contains("no such file") || status_output.contains("refused connection")
}
