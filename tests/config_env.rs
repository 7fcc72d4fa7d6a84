// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Check configuration layering of file and environment overrides.
// Author: Lukas Bower

use std::env;
use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use udev_node::config::ConfigError;
use udev_node::UdevConfig;

const VARS: [&str; 5] = ["UDEV_ROOT", "UDEV_DB", "UDEV_SYSFS", "UDEV_TEST", "UDEV_LOG"];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_file_or_env() {
    clear_env();
    let cfg = UdevConfig::load(None).expect("load");
    assert_eq!(cfg, UdevConfig::default());
    assert_eq!(cfg.root, PathBuf::from("/dev"));
    assert!(!cfg.test_run);
}

#[test]
#[serial]
fn environment_overrides_file() {
    clear_env();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("udev.toml");
    fs::write(
        &path,
        "root = \"/from-file\"\ndb_path = \"/from-file/.udevdb\"\ntest_run = false\n",
    )
    .expect("write");

    env::set_var("UDEV_ROOT", dir.path());
    env::set_var("UDEV_TEST", "1");
    let cfg = UdevConfig::load(Some(&path));
    clear_env();

    let cfg = cfg.expect("load");
    assert_eq!(cfg.root, dir.path());
    assert_eq!(cfg.db_path, PathBuf::from("/from-file/.udevdb"));
    assert!(cfg.test_run);
}

#[test]
#[serial]
fn invalid_environment_value_is_an_error() {
    clear_env();
    env::set_var("UDEV_TEST", "sometimes");
    let result = UdevConfig::load(None);
    clear_env();
    assert!(matches!(result, Err(ConfigError::Env { var: "UDEV_TEST", .. })));
}

#[test]
#[serial]
fn missing_file_is_a_read_error() {
    clear_env();
    let result = UdevConfig::load(Some(std::path::Path::new("/nonexistent/udev.toml")));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}
