//! Configuration types for the mqsup control plane.
//!
//! Loads all control-plane parameters from a TOML file:
//!
//! - [`Paths`] - filesystem locations for everything this tool creates or reads
//! - [`Commands`] - consumer command templates and the message bound
//! - [`WorkerOptions`] - supervision options applied to every worker stanza
//! - [`DaemonSettings`] - daemon identity, binaries and wait tuning
//! - consumer maps - the worker set, keyed by name
//!
//! All fields have defaults suitable for a `supervisor/` workspace next to
//! the configuration file. Relative paths resolve against the configuration
//! file's directory.
//!
//! # Example Configuration
//!
//! ```toml
//! worker_count = 2
//!
//! [commands]
//! executable = "bin/console"
//! max_messages = 500
//!
//! [consumers.orders]
//! [consumers.mails]
//! [multiple_consumers.notifications]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    pub const fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root configuration, one instance per supervised daemon identity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Replica count (`numprocs`) for every worker stanza.
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,

    #[serde(default)]
    pub daemon: DaemonSettings,

    #[serde(default)]
    pub paths: Paths,

    #[serde(default)]
    pub commands: Commands,

    #[serde(default)]
    pub worker: WorkerOptions,

    /// Single consumers, one worker stanza per key. Only the keys are used
    /// here; the table values belong to the consumer configuration layer
    /// and are carried opaquely.
    #[serde(default)]
    pub consumers: BTreeMap<String, toml::Value>,

    /// Multiple consumers, rendered with the multi-consumer command
    /// template. Must not share a key with `consumers`.
    #[serde(default)]
    pub multiple_consumers: BTreeMap<String, toml::Value>,
}

/// Daemon identity, control binaries and shutdown-wait tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DaemonSettings {
    /// Supervisord instance identifier, passed on daemon bootstrap.
    pub identifier: String,

    /// Working directory for every control and daemon invocation.
    pub application_directory: PathBuf,

    /// Control utility binary.
    pub supervisorctl: PathBuf,

    /// Daemon binary, launched directly when the control socket is absent.
    pub supervisord: PathBuf,

    /// Maximum time to wait for the daemon to disappear after a blocking
    /// kill before surfacing a timeout.
    pub stop_wait_secs: u64,

    /// Liveness poll interval for the wait loop.
    pub poll_interval_ms: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            application_directory: PathBuf::from("."),
            supervisorctl: PathBuf::from("supervisorctl"),
            supervisord: PathBuf::from("supervisord"),
            stop_wait_secs: default_stop_wait_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DaemonSettings {
    pub const fn stop_wait(&self) -> Duration {
        Duration::from_secs(self.stop_wait_secs)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Filesystem locations for everything this tool creates or reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Paths {
    pub workspace_directory: PathBuf,
    pub configuration_file: PathBuf,
    /// Written by the daemon, read-only here.
    pub pid_file: PathBuf,
    pub sock_file: PathBuf,
    pub log_file: PathBuf,
    pub worker_configuration_directory: PathBuf,
    pub worker_output_log_file: PathBuf,
    pub worker_error_log_file: PathBuf,
    /// Mode applied to every file this tool writes. Accepts an octal
    /// string (`"0700"`) or integer (`0o700`).
    #[serde(deserialize_with = "deserialize_file_mode")]
    pub file_mode: u32,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            workspace_directory: PathBuf::from("supervisor"),
            configuration_file: PathBuf::from("supervisor/supervisord.conf"),
            pid_file: PathBuf::from("supervisor/supervisor.pid"),
            sock_file: PathBuf::from("supervisor/supervisor.sock"),
            log_file: PathBuf::from("supervisor/supervisord.log"),
            worker_configuration_directory: PathBuf::from("supervisor/worker"),
            worker_output_log_file: PathBuf::from("supervisor/logs/stdout.log"),
            worker_error_log_file: PathBuf::from("supervisor/logs/stderr.log"),
            file_mode: default_file_mode(),
        }
    }
}

impl Paths {
    /// Every directory that must exist before files are written: the two
    /// directory paths themselves plus the parent of each file path.
    pub fn implied_directories(&self) -> Vec<PathBuf> {
        let mut directories = vec![
            self.workspace_directory.clone(),
            self.worker_configuration_directory.clone(),
        ];
        for file in [
            &self.configuration_file,
            &self.pid_file,
            &self.sock_file,
            &self.log_file,
            &self.worker_output_log_file,
            &self.worker_error_log_file,
        ] {
            if let Some(parent) = file.parent() {
                if !parent.as_os_str().is_empty() {
                    directories.push(parent.to_path_buf());
                }
            }
        }
        directories
    }
}

/// Consumer command templates and the shared message bound.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Commands {
    /// Executable every worker launches. Configured explicitly, never
    /// derived from the invoking process environment.
    pub executable: PathBuf,

    /// Command template for single consumers. Takes exactly two positional
    /// substitutions: `%1$d` the message bound, `%2$s` the consumer name.
    pub consumer: String,

    /// Command template for multiple consumers, same substitutions.
    pub multiple_consumer: String,

    /// Maximum messages a worker consumes per run before restarting.
    pub max_messages: u32,
}

impl Default for Commands {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("bin/console"),
            consumer: "rabbitmq:consumer -m %1$d %2$s".to_string(),
            multiple_consumer: "rabbitmq:multiple-consumer -m %1$d %2$s".to_string(),
            max_messages: default_max_messages(),
        }
    }
}

/// Supervision options applied identically to every worker stanza.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WorkerOptions {
    /// Seconds a worker must stay up to count as started.
    pub startsecs: u32,
    pub autorestart: bool,
    pub stopsignal: StopSignal,
    pub stopasgroup: bool,
    /// Seconds the daemon waits for a worker to stop before killing it.
    pub stopwaitsecs: u32,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            startsecs: 2,
            autorestart: true,
            stopsignal: StopSignal::Int,
            stopasgroup: true,
            stopwaitsecs: 60,
        }
    }
}

/// Signal the daemon sends workers on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StopSignal {
    Term,
    Int,
    Kill,
}

impl fmt::Display for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term => write!(f, "TERM"),
            Self::Int => write!(f, "INT"),
            Self::Kill => write!(f, "KILL"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            daemon: DaemonSettings::default(),
            paths: Paths::default(),
            commands: Commands::default(),
            worker: WorkerOptions::default(),
            consumers: BTreeMap::new(),
            multiple_consumers: BTreeMap::new(),
        }
    }
}

const fn default_worker_count() -> u32 {
    1
}
const fn default_max_messages() -> u32 {
    250
}
const fn default_file_mode() -> u32 {
    0o700
}
const fn default_stop_wait_secs() -> u64 {
    60
}
const fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_identifier() -> String {
    "mqsup".to_string()
}

fn deserialize_file_mode<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;
    let value = toml::Value::deserialize(deserializer)?;
    match value {
        toml::Value::Integer(n) => {
            u32::try_from(n).map_err(|_| D::Error::custom("file_mode out of range"))
        }
        toml::Value::String(s) => parse_file_mode(&s).map_err(D::Error::custom),
        _ => Err(D::Error::custom(
            "file_mode must be an integer or string (e.g. 0o700 or \"0700\")",
        )),
    }
}

/// Parses an octal mode string, tolerating `0o`/`0` prefixes.
pub fn parse_file_mode(s: &str) -> std::result::Result<u32, String> {
    let t = s.trim();
    let t = t.strip_prefix("0o").unwrap_or(t);
    let t = t.strip_prefix("0O").unwrap_or(t);
    let t = if t.len() > 1 {
        t.strip_prefix('0').unwrap_or(t)
    } else {
        t
    };
    u32::from_str_radix(t, 8).map_err(|e| format!("invalid file_mode {s:?}: {e}"))
}

impl Config {
    /// Load configuration from the specified path.
    ///
    /// Relative paths in `[paths]` and the application directory are
    /// resolved against the configuration file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_relative_paths(base);
        Ok(config)
    }

    fn resolve_relative_paths(&mut self, base: &Path) {
        for path in [
            &mut self.paths.workspace_directory,
            &mut self.paths.configuration_file,
            &mut self.paths.pid_file,
            &mut self.paths.sock_file,
            &mut self.paths.log_file,
            &mut self.paths.worker_configuration_directory,
            &mut self.paths.worker_output_log_file,
            &mut self.paths.worker_error_log_file,
            &mut self.daemon.application_directory,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    /// Validate configuration with comprehensive checks.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every violation: zero worker count or
    /// message bound, a command template missing a positional placeholder,
    /// an invalid consumer name, or a name present in both consumer maps.
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if self.worker_count == 0 {
            errors.push("worker_count cannot be 0".to_string());
        }
        if self.commands.max_messages == 0 {
            errors.push("commands.max_messages cannot be 0".to_string());
        }
        if self.daemon.identifier.trim().is_empty() {
            errors.push("daemon.identifier cannot be empty".to_string());
        }
        if self.daemon.stop_wait_secs == 0 {
            errors.push("daemon.stop_wait_secs cannot be 0".to_string());
        }
        if self.daemon.poll_interval_ms == 0 {
            errors.push("daemon.poll_interval_ms cannot be 0".to_string());
        }

        for (label, template) in [
            ("commands.consumer", &self.commands.consumer),
            ("commands.multiple_consumer", &self.commands.multiple_consumer),
        ] {
            if !template.contains("%1$d") || !template.contains("%2$s") {
                errors.push(format!(
                    "{label} must contain both positional placeholders %1$d and %2$s (got: '{template}')"
                ));
            }
        }

        for name in self.consumers.keys().chain(self.multiple_consumers.keys()) {
            if name.trim().is_empty() {
                errors.push("consumer name cannot be empty".to_string());
            } else if name.contains(['/', '\\']) || name.starts_with('.') {
                errors.push(format!(
                    "consumer name '{name}' must be a plain file name (no path separators, no leading dot)"
                ));
            }
        }

        for name in self.consumers.keys() {
            if self.multiple_consumers.contains_key(name) {
                errors.push(format!(
                    "'{name}' is listed in both consumers and multiple_consumers"
                ));
            }
        }

        if self.consumers.is_empty() && self.multiple_consumers.is_empty() {
            warnings.push(
                "no consumers configured; build will only remove stale worker configurations"
                    .to_string(),
            );
        }

        if self.paths.file_mode & 0o077 != 0 {
            warnings.push(format!(
                "file mode {:04o} grants group/other access to generated configuration",
                self.paths.file_mode
            ));
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}
