//! Lifecycle Manager: keeps the on-disk supervisord configuration
//! synchronized with the configured consumer set and drives the daemon
//! through start/stop/restart cycles.
//!
//! All operations are synchronous and blocking. The manager exclusively
//! owns every `.conf` file directly inside the worker-configuration
//! directory and may delete and recreate them freely; it reads the
//! daemon's PID file but never writes it.

use std::fs;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use nix::sys::signal::Signal;

use crate::config::Config;

use super::control::Control;
use super::error::{Error, Result};
use super::process;
use super::render;

/// Mode for directories this tool creates (owner-only).
const DIRECTORY_MODE: u32 = 0o700;

/// Drives the supervisor daemon's configuration and lifecycle.
#[derive(Debug)]
pub struct Manager {
    config: Config,
    control: Control,
}

impl Manager {
    pub fn new(config: Config) -> Self {
        let control = Control::from_config(&config);
        Self { config, control }
    }

    /// Unconditionally (re)generates the daemon's main configuration file.
    ///
    /// Overwrites an existing file. Creates no directories and touches no
    /// worker files.
    pub fn init(&self) -> Result<()> {
        self.write_main_configuration()
    }

    /// Synchronizes all generated configuration with the current consumer
    /// set and tells the daemon to apply it.
    ///
    /// Creates missing directories, generates the main configuration only
    /// if absent (a hand-edited file survives, unlike [`Manager::init`]),
    /// removes every stale `.conf` in the worker directory, renders one
    /// stanza per consumer, ensures the daemon is up and issues
    /// reread/update. Idempotent for an unchanged consumer set. Any
    /// filesystem failure aborts before the daemon is contacted; partial
    /// writes are not rolled back.
    pub fn build(&self) -> Result<()> {
        self.create_path_directories()?;

        if !self.config.paths.configuration_file.is_file() {
            self.write_main_configuration()?;
        }

        self.sweep_worker_configurations()?;

        for name in self.config.consumers.keys() {
            self.write_worker_configuration(name, &self.config.commands.consumer)?;
        }
        for name in self.config.multiple_consumers.keys() {
            self.write_worker_configuration(name, &self.config.commands.multiple_consumer)?;
        }

        self.control.ensure_running()?;
        self.control.reload_and_apply()
    }

    /// Stop, rebuild configuration for and start the daemon.
    ///
    /// The full bounce for changes that reread/update alone cannot apply.
    pub fn rebuild(&self) -> Result<()> {
        self.stop()?;
        self.build()
    }

    /// Stop and start the daemon to force every managed process to
    /// restart. Configuration files are not touched.
    pub fn restart(&self) -> Result<()> {
        self.stop()?;
        self.start()
    }

    /// Start the daemon if it is not already running.
    pub fn start(&self) -> Result<()> {
        self.control.ensure_running()
    }

    /// Stop the daemon and all its processes, blocking until it is gone.
    pub fn stop(&self) -> Result<()> {
        self.kill(None, true)
    }

    /// Ask the daemon to gracefully restart all processes in place.
    /// Fire-and-forget: does not wait, daemon PID is unchanged.
    pub fn hup(&self) -> Result<()> {
        self.kill(Some(Signal::SIGHUP), false)
    }

    /// The daemon's status output, verbatim.
    pub fn status(&self) -> Result<String> {
        self.control.query_status()
    }

    /// Sends a signal to the daemon process named by the PID file.
    ///
    /// A missing/empty/unparseable PID file or a dead PID is a no-op, so
    /// this never signals a reused process id. `None` sends the default
    /// termination signal. With `wait` set, blocks until the process has
    /// disappeared, up to the configured stop wait.
    pub fn kill(&self, signal: Option<Signal>, wait: bool) -> Result<()> {
        let Some(pid) = process::read_pid(&self.config.paths.pid_file) else {
            tracing::debug!("no supervisord pid on record, nothing to signal");
            return Ok(());
        };
        if !process::is_alive(pid) {
            tracing::debug!(pid, "supervisord pid is not alive, nothing to signal");
            return Ok(());
        }

        let signal = signal.unwrap_or(Signal::SIGTERM);
        tracing::info!(pid, %signal, "signalling supervisord");
        process::send_signal(pid, signal)?;

        if wait {
            self.wait_for_pid(pid)?;
        }
        Ok(())
    }

    /// Blocks until the daemon process named by the PID file has
    /// disappeared, up to the configured stop wait.
    pub fn wait(&self) -> Result<()> {
        if let Some(pid) = process::read_pid(&self.config.paths.pid_file) {
            if process::is_alive(pid) {
                self.wait_for_pid(pid)?;
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn wait_for_pid(&self, pid: u32) -> Result<()> {
        process::wait_for_exit(
            pid,
            self.config.daemon.poll_interval(),
            self.config.daemon.stop_wait(),
        )?;
        tracing::info!(pid, "supervisord exited");
        Ok(())
    }

    fn create_path_directories(&self) -> Result<()> {
        for directory in self.config.paths.implied_directories() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(DIRECTORY_MODE)
                .create(&directory)
                .map_err(|e| {
                    Error::fs(
                        format!("failed to create directory {}", directory.display()),
                        e,
                    )
                })?;
        }
        Ok(())
    }

    fn write_main_configuration(&self) -> Result<()> {
        let rendered = render::main_configuration(&self.config.paths)?;
        let path = &self.config.paths.configuration_file;
        fs::write(path, rendered)
            .map_err(|e| Error::fs(format!("failed to write {}", path.display()), e))?;
        self.apply_file_mode(path)?;
        tracing::info!(path = %path.display(), "generated supervisord main configuration");
        Ok(())
    }

    /// Removes every `.conf` file directly inside the worker-configuration
    /// directory, so consumers removed from the set leave no orphaned
    /// stanza behind. Non-recursive; directories are skipped.
    fn sweep_worker_configurations(&self) -> Result<()> {
        let directory = &self.config.paths.worker_configuration_directory;
        let entries = fs::read_dir(directory)
            .map_err(|e| Error::fs(format!("failed to read {}", directory.display()), e))?;

        for entry in entries {
            let entry = entry
                .map_err(|e| Error::fs(format!("failed to read {}", directory.display()), e))?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if path.extension().is_some_and(|ext| ext == "conf") {
                fs::remove_file(&path)
                    .map_err(|e| Error::fs(format!("failed to remove {}", path.display()), e))?;
                tracing::debug!(path = %path.display(), "removed stale worker configuration");
            }
        }
        Ok(())
    }

    fn write_worker_configuration(&self, name: &str, command_template: &str) -> Result<()> {
        let rendered = render::worker_configuration(
            name,
            command_template,
            &self.config.commands,
            &self.config.worker,
            &self.config.paths,
            self.config.worker_count,
        )?;
        let path = self
            .config
            .paths
            .worker_configuration_directory
            .join(format!("{name}.conf"));
        fs::write(&path, rendered)
            .map_err(|e| Error::fs(format!("failed to write {}", path.display()), e))?;
        self.apply_file_mode(&path)?;
        tracing::debug!(worker = name, path = %path.display(), "generated worker configuration");
        Ok(())
    }

    fn apply_file_mode(&self, path: &Path) -> Result<()> {
        let mode = self.config.paths.file_mode;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| Error::fs(format!("failed to chmod {}", path.display()), e))
    }
}
