// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load the device root, database and test-mode configuration.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file unreadable.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// OS error.
        source: std::io::Error,
    },
    /// Config file is not valid TOML for [`UdevConfig`].
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },
    /// Environment override has an unusable value.
    #[error("invalid value '{value}' for {var}")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Settings read once per process and passed into every device addition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UdevConfig {
    /// Directory all nodes and links are created below.
    pub root: PathBuf,
    /// Directory of the device database.
    pub db_path: PathBuf,
    /// Mount point of sysfs.
    pub sysfs_path: PathBuf,
    /// Log intended actions without touching the system.
    pub test_run: bool,
    /// Mode for devices the naming policy leaves without one.
    pub default_mode: u32,
    /// Owner for devices the naming policy leaves without one.
    pub default_owner: String,
    /// Group for devices the naming policy leaves without one.
    pub default_group: String,
    /// Default log filter for the binary.
    pub log_level: String,
}

impl Default for UdevConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/dev"),
            db_path: PathBuf::from("/dev/.udevdb"),
            sysfs_path: PathBuf::from("/sys"),
            test_run: false,
            default_mode: 0o600,
            default_owner: String::new(),
            default_group: String::new(),
            log_level: "info".to_owned(),
        }
    }
}

impl UdevConfig {
    /// Parse a TOML config file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the optional file, then `UDEV_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env(|var| std::env::var(var).ok())?;
        Ok(cfg)
    }

    /// Apply overrides from `lookup`, normally the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(root) = lookup("UDEV_ROOT") {
            self.root = PathBuf::from(root);
        }
        if let Some(db) = lookup("UDEV_DB") {
            self.db_path = PathBuf::from(db);
        }
        if let Some(sysfs) = lookup("UDEV_SYSFS") {
            self.sysfs_path = PathBuf::from(sysfs);
        }
        if let Some(value) = lookup("UDEV_TEST") {
            self.test_run = parse_bool(&value).ok_or(ConfigError::Env {
                var: "UDEV_TEST",
                value,
            })?;
        }
        if let Some(level) = lookup("UDEV_LOG") {
            self.log_level = level;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parse an octal mode such as `0660` or `0o660`.
#[must_use]
pub fn parse_mode(text: &str) -> Option<u32> {
    let text = text.trim();
    let digits = text.strip_prefix("0o").unwrap_or(text);
    u32::from_str_radix(digits, 8).ok().filter(|mode| *mode <= 0o7777)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_apply_on_top() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("UDEV_ROOT", "/tmp/udev"),
            ("UDEV_TEST", "yes"),
        ]);
        let mut cfg = UdevConfig::default();
        cfg.apply_env(|k| vars.get(k).map(|v| (*v).to_owned())).expect("env");
        assert_eq!(cfg.root, PathBuf::from("/tmp/udev"));
        assert!(cfg.test_run);
        assert_eq!(cfg.db_path, PathBuf::from("/dev/.udevdb"));
    }

    #[test]
    fn bad_test_flag_is_rejected() {
        let mut cfg = UdevConfig::default();
        let err = cfg
            .apply_env(|k| (k == "UDEV_TEST").then(|| "maybe".to_owned()))
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Env { var: "UDEV_TEST", .. }));
    }

    #[test]
    fn modes_are_octal() {
        assert_eq!(parse_mode("0660"), Some(0o660));
        assert_eq!(parse_mode("0o640"), Some(0o640));
        assert_eq!(parse_mode("755"), Some(0o755));
        assert_eq!(parse_mode("0999"), None);
        assert_eq!(parse_mode("77777"), None);
    }

    #[test]
    fn toml_file_keeps_unset_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("udev.toml");
        fs::write(&path, "root = \"/udev\"\ndefault_mode = 0o660\n").expect("write");
        let cfg = UdevConfig::from_file(&path).expect("parse");
        assert_eq!(cfg.root, PathBuf::from("/udev"));
        assert_eq!(cfg.default_mode, 0o660);
        assert_eq!(cfg.sysfs_path, PathBuf::from("/sys"));

        fs::write(&path, "rooot = \"/udev\"\n").expect("write");
        assert!(matches!(UdevConfig::from_file(&path), Err(ConfigError::Parse { .. })));
    }
}
