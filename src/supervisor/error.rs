//! Error types for supervisor control-plane operations.

use std::time::Duration;

/// Result type for supervisor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Supervisor control-plane errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An external control or daemon command could not be launched, or the
    /// daemon bootstrap exited non-zero. Never retried here.
    #[error("control command `{command}` failed{}: {output}", fmt_status(.status))]
    ControlExecution {
        command: String,
        /// Exit code of the subprocess, if it ran at all.
        status: Option<i32>,
        output: String,
    },

    /// Directory/file create, write, chmod or read failure.
    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration-file template expansion failure.
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),

    /// Signal delivery to a live process failed (e.g. insufficient
    /// permissions). A process that disappeared between the liveness probe
    /// and the signal is not an error.
    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        pid: u32,
        signal: nix::sys::signal::Signal,
        #[source]
        source: nix::errno::Errno,
    },

    /// The wait-for-exit loop expired before the process disappeared.
    #[error("timed out after {waited:?} waiting for pid {pid} to exit")]
    Timeout { pid: u32, waited: Duration },
}

impl Error {
    /// Create a filesystem error with context.
    pub fn fs(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Filesystem {
            context: context.into(),
            source,
        }
    }
}

fn fmt_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" with exit status {code}"),
        None => String::new(),
    }
}
