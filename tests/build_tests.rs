//! Integration tests for configuration materialization: `build`'s
//! directory creation, stale-stanza sweeping, set mirroring and
//! idempotence, all against stub control binaries.

#![cfg(unix)]

mod common;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use common::TestEnv;
use mqsup::supervisor::Manager;

fn consumer_set(names: &[&str]) -> BTreeMap<String, toml::Value> {
    names
        .iter()
        .map(|n| ((*n).to_string(), toml::Value::Boolean(true)))
        .collect()
}

fn read_worker_dir(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(Result::unwrap)
        .filter(|e| e.path().is_file())
        .map(|e| {
            (
                e.file_name().to_string_lossy().into_owned(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect()
}

#[test]
fn build_renders_one_stanza_per_consumer() {
    let env = TestEnv::new();
    let mut config = env.config();
    config.consumers = consumer_set(&["orders", "mails"]);
    config.multiple_consumers = consumer_set(&["notifications"]);

    Manager::new(config.clone()).build().unwrap();

    assert_eq!(
        env.worker_conf_names(),
        vec!["mails.conf", "notifications.conf", "orders.conf"]
    );

    let orders = fs::read_to_string(
        config
            .paths
            .worker_configuration_directory
            .join("orders.conf"),
    )
    .unwrap();
    assert!(orders.contains("[program:orders]"));
    assert!(orders.contains("rabbitmq:consumer -m 250 orders"));
    assert!(orders.contains("autorestart=true"));

    let notifications = fs::read_to_string(
        config
            .paths
            .worker_configuration_directory
            .join("notifications.conf"),
    )
    .unwrap();
    assert!(notifications.contains("rabbitmq:multiple-consumer -m 250 notifications"));
}

#[test]
fn build_contacts_daemon_in_order() {
    let env = TestEnv::new();
    let mut config = env.config();
    config.consumers = consumer_set(&["orders"]);

    Manager::new(config).build().unwrap();

    // status probe first, then reread, then update
    assert_eq!(env.control_subcommands(), vec!["status", "reread", "update"]);
    // healthy status text, so the daemon must not have been launched
    assert!(!env.daemon_marker.exists());
}

#[test]
fn build_is_idempotent_for_unchanged_consumer_set() {
    let env = TestEnv::new();
    let mut config = env.config();
    config.consumers = consumer_set(&["orders", "mails"]);
    let worker_dir = config.paths.worker_configuration_directory.clone();

    let manager = Manager::new(config);
    manager.build().unwrap();
    let first = read_worker_dir(&worker_dir);
    manager.build().unwrap();
    let second = read_worker_dir(&worker_dir);

    assert_eq!(first, second);
}

#[test]
fn build_mirrors_changed_consumer_set() {
    let env = TestEnv::new();
    let mut config = env.config();
    config.consumers = consumer_set(&["a", "b"]);
    Manager::new(config).build().unwrap();
    assert_eq!(env.worker_conf_names(), vec!["a.conf", "b.conf"]);

    let mut config = env.config();
    config.consumers = consumer_set(&["b", "c"]);
    Manager::new(config).build().unwrap();
    assert_eq!(env.worker_conf_names(), vec!["b.conf", "c.conf"]);
}

#[test]
fn build_sweep_skips_directories_and_foreign_files() {
    let env = TestEnv::new();
    let mut config = env.config();
    config.consumers = consumer_set(&["orders"]);
    let worker_dir = config.paths.worker_configuration_directory.clone();

    fs::create_dir_all(worker_dir.join("archive.conf")).unwrap();
    fs::create_dir_all(&worker_dir).unwrap();
    fs::write(worker_dir.join("NOTES.txt"), "keep me").unwrap();
    fs::write(worker_dir.join("stale.conf"), "[program:stale]").unwrap();

    Manager::new(config).build().unwrap();

    assert!(worker_dir.join("archive.conf").is_dir());
    assert!(worker_dir.join("NOTES.txt").is_file());
    assert!(!worker_dir.join("stale.conf").exists());
    assert!(worker_dir.join("orders.conf").is_file());
}

#[test]
fn build_preserves_hand_edited_main_configuration() {
    let env = TestEnv::new();
    let config = env.config();
    fs::create_dir_all(config.paths.configuration_file.parent().unwrap()).unwrap();
    fs::write(&config.paths.configuration_file, "# hand edited\n").unwrap();

    let manager = Manager::new(config.clone());
    manager.build().unwrap();
    assert_eq!(
        fs::read_to_string(&config.paths.configuration_file).unwrap(),
        "# hand edited\n"
    );

    // init is the deliberate counterpart that does overwrite
    manager.init().unwrap();
    let regenerated = fs::read_to_string(&config.paths.configuration_file).unwrap();
    assert!(regenerated.contains("[supervisord]"));
}

#[test]
fn build_generates_main_configuration_when_missing() {
    let env = TestEnv::new();
    let config = env.config();

    Manager::new(config.clone()).build().unwrap();

    let content = fs::read_to_string(&config.paths.configuration_file).unwrap();
    assert!(content.contains(&format!(
        "pidfile={}",
        config.paths.pid_file.display()
    )));
    assert!(content.contains(&format!(
        "serverurl=unix://{}",
        config.paths.sock_file.display()
    )));
}

#[test]
fn build_aborts_before_daemon_contact_on_filesystem_failure() {
    let env = TestEnv::new();
    let mut config = env.config();
    config.consumers = consumer_set(&["orders"]);
    // A file where the worker directory should be makes directory
    // creation fail regardless of privileges.
    fs::create_dir_all(config.paths.workspace_directory.clone()).unwrap();
    fs::write(&config.paths.worker_configuration_directory, "not a dir").unwrap();

    let result = Manager::new(config).build();
    assert!(result.is_err());
    assert!(env.control_subcommands().is_empty());
}

#[test]
fn build_applies_file_mode_to_generated_files() {
    use std::os::unix::fs::PermissionsExt;

    let env = TestEnv::new();
    let mut config = env.config();
    config.consumers = consumer_set(&["orders"]);
    config.paths.file_mode = 0o640;

    Manager::new(config.clone()).build().unwrap();

    let mode = fs::metadata(
        config
            .paths
            .worker_configuration_directory
            .join("orders.conf"),
    )
    .unwrap()
    .permissions()
    .mode();
    assert_eq!(mode & 0o777, 0o640);
}
