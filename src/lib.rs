// Safety: nothing here needs unsafe
#![deny(unsafe_code)]
// Correctness: Must handle all fallible operations
#![deny(unused_must_use)]
// Quality: Pedantic but pragmatic
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
// Allowed with documented reasons
#![allow(clippy::missing_errors_doc)] // Error returns self-documenting via type
#![allow(clippy::module_name_repetitions)] // e.g., supervisor::Manager re-exports
#![allow(clippy::must_use_candidate)] // Not all returned values need annotation

//! Library crate for mqsup - a control plane for a supervisord instance
//! running message-queue consumer workers.
//!
//! The crate materializes the daemon's main configuration plus one
//! `[program:...]` stanza per configured consumer, and drives the daemon
//! through idempotent build/rebuild/restart/stop/start cycles:
//!
//! - [`config`] - the TOML parameter layer (paths, command templates,
//!   worker options, consumer set)
//! - [`supervisor`] - the core: control-command execution, liveness
//!   detection and lifecycle orchestration
//! - [`logging`] - tracing subscriber setup for the CLI
//!
//! # Example
//!
//! ```no_run
//! use mqsup::config::Config;
//! use mqsup::supervisor::Manager;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load_from("mqsup.toml")?;
//! config.validate()?;
//! Manager::new(config).build()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod supervisor;
