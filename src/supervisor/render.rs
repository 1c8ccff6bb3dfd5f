//! Rendering of the generated supervisord configuration files.
//!
//! Two askama templates produce all on-disk configuration: the daemon's
//! main configuration and one `[program:...]` stanza per worker. Worker
//! option booleans render as the literal tokens `true`/`false`, which is
//! what supervisord expects.

use askama::Template;

use crate::config::{Commands, Paths, WorkerOptions};

use super::error::Result;

#[derive(Template)]
#[template(path = "supervisord.conf", escape = "none")]
struct MainConfTemplate {
    pid_file: String,
    sock_file: String,
    log_file: String,
    file_mode: String,
    worker_configuration_directory: String,
}

#[derive(Template)]
#[template(path = "program.conf", escape = "none")]
struct WorkerConfTemplate {
    name: String,
    command: String,
    executable: String,
    numprocs: u32,
    stdout_logfile: String,
    stderr_logfile: String,
    options: Vec<(&'static str, String)>,
}

/// Renders the daemon's main configuration file.
pub fn main_configuration(paths: &Paths) -> Result<String> {
    let template = MainConfTemplate {
        pid_file: paths.pid_file.display().to_string(),
        sock_file: paths.sock_file.display().to_string(),
        log_file: paths.log_file.display().to_string(),
        file_mode: format_mode(paths.file_mode),
        worker_configuration_directory: paths
            .worker_configuration_directory
            .display()
            .to_string(),
    };
    Ok(template.render()?)
}

/// Renders one worker stanza for the named consumer.
///
/// `command_template` is one of the two configured consumer command
/// templates; the worker count and log paths are shared by every stanza.
pub fn worker_configuration(
    name: &str,
    command_template: &str,
    commands: &Commands,
    options: &WorkerOptions,
    paths: &Paths,
    numprocs: u32,
) -> Result<String> {
    let template = WorkerConfTemplate {
        name: name.to_string(),
        command: render_command(command_template, commands.max_messages, name),
        executable: commands.executable.display().to_string(),
        numprocs,
        stdout_logfile: paths.worker_output_log_file.display().to_string(),
        stderr_logfile: paths.worker_error_log_file.display().to_string(),
        options: option_lines(options),
    };
    Ok(template.render()?)
}

/// Substitutes the two positional placeholders of a consumer command
/// template: `%1$d` is the message bound, `%2$s` the consumer name.
pub fn render_command(template: &str, max_messages: u32, name: &str) -> String {
    template
        .replace("%1$d", &max_messages.to_string())
        .replace("%2$s", name)
}

/// The supervision options of a worker stanza, in a fixed order, with
/// booleans as literal `true`/`false` tokens.
fn option_lines(options: &WorkerOptions) -> Vec<(&'static str, String)> {
    vec![
        ("startsecs", options.startsecs.to_string()),
        ("autorestart", options.autorestart.to_string()),
        ("stopsignal", options.stopsignal.to_string()),
        ("stopasgroup", options.stopasgroup.to_string()),
        ("stopwaitsecs", options.stopwaitsecs.to_string()),
    ]
}

/// Formats a file mode the way supervisord configuration expects (e.g.
/// `0700`).
fn format_mode(mode: u32) -> String {
    format!("{mode:04o}")
}
