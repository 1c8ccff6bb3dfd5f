//! Tracing subscriber setup for the CLI.
//!
//! Control-plane actions are logged as structured `tracing` events at
//! their call sites; this module wires them to stderr once at startup.
//! `RUST_LOG` overrides the level when set.

use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Initialize the global tracing subscriber.
///
/// Should be called once at startup. `verbose` lowers the default level
/// to DEBUG; an explicit `RUST_LOG` wins either way.
pub fn init(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr),
    );
    let _ = tracing::subscriber::set_global_default(subscriber);
}
