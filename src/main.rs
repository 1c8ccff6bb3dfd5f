//! mqsup - control plane for a supervisord instance running message-queue
//! consumer workers.
//!
//! Renders the daemon's configuration (one stanza per consumer) from a
//! TOML parameter file and drives the daemon lifecycle:
//!
//! - Materialize configuration (`mqsup init`, `mqsup build`)
//! - Bounce the daemon (`mqsup rebuild`, `mqsup restart`)
//! - Start/stop/reload (`mqsup start`, `mqsup stop`, `mqsup hup`)
//! - Inspect (`mqsup status`)
//!
//! See `mqsup --help` for full usage information.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

const AFTER_HELP: &str = "\
COMMON WORKFLOWS:
  # Deploy: sync worker config with the consumer set and apply it
  mqsup build

  # Config changed in a way reread/update cannot apply
  mqsup rebuild

  # Roll all workers without touching configuration
  mqsup restart

EXAMPLES:
  mqsup build                       Render config, start daemon, reread/update
  mqsup -c deploy/mqsup.toml build  Use an explicit parameter file
  mqsup status                      Show supervisord worker status
  mqsup stop                        Stop daemon and workers, wait for exit";

#[derive(Parser)]
#[command(name = "mqsup")]
#[command(version)]
#[command(about = "Control plane for a supervisord instance running queue consumers")]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Path to the mqsup parameter file
    #[arg(short = 'c', long = "config", global = true, default_value = "mqsup.toml")]
    config: PathBuf,

    /// Enable verbose/debug output for any command
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Regenerate the supervisord main configuration file
    ///
    /// Overwrites an existing file and creates no directories. Use `build`
    /// for the full, directory-creating synchronization.
    Init,
    /// Sync generated configuration with the consumer set and apply it
    ///
    /// Creates missing directories, removes stale worker stanzas, renders
    /// one stanza per consumer, starts the daemon if needed and issues
    /// reread/update. Safe to run repeatedly.
    Build,
    /// Stop the daemon, rebuild configuration, start it again
    ///
    /// The full bounce, for changes running workers cannot pick up via
    /// reread/update alone.
    Rebuild,
    /// Stop and start the daemon to force all workers to restart
    Restart,
    /// Start the daemon if it is not already running
    Start,
    /// Stop the daemon and all workers, waiting until it has exited
    Stop,
    /// Send HUP to gracefully restart all workers in place
    Hup,
    /// Show the daemon's status output
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    mqsup::logging::init(cli.verbose);

    match cli.command {
        Command::Init => commands::init(&cli.config),
        Command::Build => commands::build(&cli.config),
        Command::Rebuild => commands::rebuild(&cli.config),
        Command::Restart => commands::restart(&cli.config),
        Command::Start => commands::start(&cli.config),
        Command::Stop => commands::stop(&cli.config),
        Command::Hup => commands::hup(&cli.config),
        Command::Status => commands::status(&cli.config),
    }
}
