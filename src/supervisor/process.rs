//! OS process primitives: PID-file reading, liveness probing, signal
//! delivery and the bounded wait-for-exit loop.
//!
//! The PID file is written by the supervisor daemon, never by this crate;
//! it is read-only ground truth for locating the daemon.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;
use sysinfo::{Pid, ProcessesToUpdate, System};

use super::error::{Error, Result};

/// Reads the daemon PID from a PID file.
///
/// An absent, unreadable or empty file, or content that does not parse as a
/// decimal process id, all yield `None` — "not running" rather than an
/// error.
pub fn read_pid(pid_file: &Path) -> Option<u32> {
    let raw = fs::read_to_string(pid_file).ok()?;
    raw.trim().parse().ok()
}

/// Checks whether a process with the given PID is currently alive.
///
/// Queries the system's process table; a non-existent PID is `false`, not
/// an error, making this safe to use for polling.
pub fn is_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system.process(Pid::from(pid as usize)).is_some()
}

/// Delivers a signal to the given PID.
///
/// A process that vanished since the caller's liveness probe (ESRCH) is a
/// no-op, not an error.
pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    match signal::kill(NixPid::from_raw(pid as i32), signal) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(source) => Err(Error::Signal {
            pid,
            signal,
            source,
        }),
    }
}

/// Polls the process table until the PID is no longer alive.
///
/// Returns [`Error::Timeout`] once `max_wait` has elapsed with the process
/// still present. The loop never blocks unbounded.
pub fn wait_for_exit(pid: u32, poll_interval: Duration, max_wait: Duration) -> Result<()> {
    let deadline = Instant::now() + max_wait;
    while is_alive(pid) {
        if Instant::now() >= deadline {
            return Err(Error::Timeout {
                pid,
                waited: max_wait,
            });
        }
        thread::sleep(poll_interval);
    }
    Ok(())
}
