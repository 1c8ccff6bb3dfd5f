//! Common test utilities for integration tests.
//!
//! Provides a [`TestEnv`] that stands up an isolated workspace with stub
//! `supervisorctl`/`supervisord` shell scripts. The control stub appends
//! its arguments to a call log and prints a configurable status text; the
//! daemon stub records its arguments and touches a launch marker. Both are
//! wired into the [`Config`] the environment hands out, so a `Manager`
//! built from it never touches a real supervisor installation.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use mqsup::config::Config;

/// Status text the control stub prints by default: a reachable daemon.
pub const HEALTHY_STATUS: &str = "orders    RUNNING   pid 4242, uptime 0:00:01\n";

/// Status text signalling an absent control socket.
pub const SOCKET_MISSING_STATUS: &str = "unix:///var/run/supervisor.sock no such file\n";

pub struct TestEnv {
    pub dir: TempDir,
    /// One line per control-stub invocation (full argument list).
    pub control_calls: PathBuf,
    /// One line per daemon-stub invocation.
    pub daemon_calls: PathBuf,
    /// Touched by the daemon stub when "launched".
    pub daemon_marker: PathBuf,
    status_file: PathBuf,
    control_stub: PathBuf,
    daemon_stub: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create tempdir");
        let root = dir.path();
        let env = Self {
            control_calls: root.join("control-calls.log"),
            daemon_calls: root.join("daemon-calls.log"),
            daemon_marker: root.join("daemon-launched"),
            status_file: root.join("status.txt"),
            control_stub: root.join("supervisorctl-stub"),
            daemon_stub: root.join("supervisord-stub"),
            dir,
        };

        env.set_status(HEALTHY_STATUS);
        write_stub(
            &env.control_stub,
            &format!(
                "#!/bin/sh\nprintf '%s\\n' \"$*\" >> {}\ncat {}\n",
                env.control_calls.display(),
                env.status_file.display()
            ),
        );
        write_stub(
            &env.daemon_stub,
            &format!(
                "#!/bin/sh\nprintf '%s\\n' \"$*\" >> {}\ntouch {}\n",
                env.daemon_calls.display(),
                env.daemon_marker.display()
            ),
        );
        env
    }

    /// A config rooted in this environment's tempdir, pointing at the
    /// stub binaries, with short wait tuning suitable for tests.
    pub fn config(&self) -> Config {
        let root = self.dir.path();
        let mut config = Config::default();
        config.paths.workspace_directory = root.join("supervisor");
        config.paths.configuration_file = root.join("supervisor/supervisord.conf");
        config.paths.pid_file = root.join("supervisor/supervisor.pid");
        config.paths.sock_file = root.join("supervisor/supervisor.sock");
        config.paths.log_file = root.join("supervisor/supervisord.log");
        config.paths.worker_configuration_directory = root.join("supervisor/worker");
        config.paths.worker_output_log_file = root.join("supervisor/logs/stdout.log");
        config.paths.worker_error_log_file = root.join("supervisor/logs/stderr.log");
        config.daemon.application_directory = root.to_path_buf();
        config.daemon.supervisorctl = self.control_stub.clone();
        config.daemon.supervisord = self.daemon_stub.clone();
        config.daemon.poll_interval_ms = 50;
        config.daemon.stop_wait_secs = 5;
        config
    }

    /// Replace the status text the control stub prints.
    pub fn set_status(&self, text: &str) {
        fs::write(&self.status_file, text).expect("write status text");
    }

    /// The control subcommands invoked so far, in order (the trailing
    /// argument of each logged invocation).
    pub fn control_subcommands(&self) -> Vec<String> {
        let Ok(content) = fs::read_to_string(&self.control_calls) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| line.rsplit(' ').next())
            .map(ToString::to_string)
            .collect()
    }

    /// File names (with `.conf` extension) currently in the worker
    /// configuration directory, sorted.
    pub fn worker_conf_names(&self) -> Vec<String> {
        let dir = self.dir.path().join("supervisor/worker");
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "conf"))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn write_stub(path: &Path, script: &str) {
    fs::write(path, script).expect("write stub script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod stub");
}
