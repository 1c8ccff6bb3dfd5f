//! CLI command handlers.
//!
//! Each handler loads + validates the configuration, builds a
//! [`Manager`] and invokes exactly one lifecycle operation. All output
//! meant for humans goes through `println!`; diagnostics go through
//! `tracing`.

use std::path::Path;

use anyhow::Result;

use mqsup::config::Config;
use mqsup::supervisor::Manager;

fn manager(config_path: &Path) -> Result<Manager> {
    let config = Config::load_from(config_path)?;
    let validation = config.validate()?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }
    Ok(Manager::new(config))
}

/// Regenerate the daemon's main configuration file, overwriting any
/// existing one.
pub fn init(config_path: &Path) -> Result<()> {
    let manager = manager(config_path)?;
    manager.init()?;
    println!(
        "generated {}",
        manager.config().paths.configuration_file.display()
    );
    Ok(())
}

/// Synchronize all generated configuration with the consumer set and
/// apply it to the (started-if-needed) daemon.
pub fn build(config_path: &Path) -> Result<()> {
    let manager = manager(config_path)?;
    manager.build()?;
    let config = manager.config();
    println!(
        "built {} worker configuration(s) in {}",
        config.consumers.len() + config.multiple_consumers.len(),
        config.paths.worker_configuration_directory.display()
    );
    Ok(())
}

/// Stop the daemon, rebuild all configuration, start it again.
pub fn rebuild(config_path: &Path) -> Result<()> {
    let manager = manager(config_path)?;
    manager.rebuild()?;
    println!("supervisord stopped, rebuilt and started");
    Ok(())
}

/// Stop and start the daemon, forcing every worker to restart.
pub fn restart(config_path: &Path) -> Result<()> {
    manager(config_path)?.restart()?;
    println!("supervisord restarted");
    Ok(())
}

/// Start the daemon if it is not already running.
pub fn start(config_path: &Path) -> Result<()> {
    manager(config_path)?.start()?;
    println!("supervisord running");
    Ok(())
}

/// Stop the daemon and all workers, waiting until it has exited.
pub fn stop(config_path: &Path) -> Result<()> {
    manager(config_path)?.stop()?;
    println!("supervisord stopped");
    Ok(())
}

/// Send SIGHUP for a graceful in-place restart of all workers.
pub fn hup(config_path: &Path) -> Result<()> {
    manager(config_path)?.hup()?;
    println!("sent HUP to supervisord");
    Ok(())
}

/// Print the daemon's status output verbatim.
pub fn status(config_path: &Path) -> Result<()> {
    let output = manager(config_path)?.status()?;
    let trimmed = output.trim_end();
    if !trimmed.is_empty() {
        println!("{trimmed}");
    }
    Ok(())
}
