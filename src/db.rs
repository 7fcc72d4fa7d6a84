// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Record created devices for later removal.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::device::Udevice;

/// Failure while reading or writing a device record.
#[derive(Debug, Error)]
pub enum DbError {
    /// Record file could not be written or read.
    #[error("device db io error for '{path}': {source}")]
    Io {
        /// Record file path.
        path: PathBuf,
        /// OS error.
        source: io::Error,
    },
    /// Record file content is not understood.
    #[error("malformed device record '{path}': {reason}")]
    Malformed {
        /// Record file path.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },
}

/// Persistence of created devices.
pub trait DeviceDb {
    /// Remember `udev` after its node was created.
    fn record(&self, udev: &Udevice) -> Result<(), DbError>;
}

/// Database that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDb;

impl DeviceDb for NullDb {
    fn record(&self, _udev: &Udevice) -> Result<(), DbError> {
        Ok(())
    }
}

/// Stored data for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbRecord {
    /// Kernel device path.
    pub devpath: String,
    /// Name below the root.
    pub name: String,
    /// Space separated symlinks.
    pub symlink: String,
    /// Major number.
    pub major: u32,
    /// Minor number.
    pub minor: u32,
    /// Partition node count.
    pub partitions: u32,
}

impl DbRecord {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "P:{}", self.devpath);
        let _ = writeln!(out, "N:{}", self.name);
        let _ = writeln!(out, "S:{}", self.symlink);
        let _ = writeln!(out, "M:{}:{}", self.major, self.minor);
        let _ = writeln!(out, "A:{}", self.partitions);
        out
    }

    fn parse(text: &str) -> Result<Self, String> {
        let mut record = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key {
                "P" => record.devpath = value.to_owned(),
                "N" => record.name = value.to_owned(),
                "S" => record.symlink = value.to_owned(),
                "M" => {
                    let (major, minor) = value
                        .split_once(':')
                        .ok_or_else(|| format!("bad device numbers '{value}'"))?;
                    record.major = major.parse().map_err(|_| format!("bad major '{major}'"))?;
                    record.minor = minor.parse().map_err(|_| format!("bad minor '{minor}'"))?;
                }
                "A" => {
                    record.partitions =
                        value.parse().map_err(|_| format!("bad partition count '{value}'"))?;
                }
                _ => {}
            }
        }
        if record.devpath.is_empty() {
            return Err("missing devpath".into());
        }
        Ok(record)
    }
}

impl From<&Udevice> for DbRecord {
    fn from(udev: &Udevice) -> Self {
        Self {
            devpath: udev.devpath.clone(),
            name: udev.name.clone(),
            symlink: udev.symlink.clone(),
            major: udev.major,
            minor: udev.minor,
            partitions: udev.partitions,
        }
    }
}

/// One record file per device below a database directory.
#[derive(Debug, Clone)]
pub struct FileDb {
    dir: PathBuf,
}

impl FileDb {
    /// Database rooted at `dir`; created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Record file for `devpath`, with `/` mapped to `@`.
    #[must_use]
    pub fn record_path(&self, devpath: &str) -> PathBuf {
        self.dir.join(devpath.replace('/', "@"))
    }

    /// Read the record for `devpath`, if one exists.
    pub fn lookup(&self, devpath: &str) -> Result<Option<DbRecord>, DbError> {
        let path = self.record_path(devpath);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DbError::Io { path, source }),
        };
        DbRecord::parse(&text)
            .map(Some)
            .map_err(|reason| DbError::Malformed { path, reason })
    }

    fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DeviceDb for FileDb {
    fn record(&self, udev: &Udevice) -> Result<(), DbError> {
        if udev.test_run {
            return Ok(());
        }
        fs::create_dir_all(self.dir()).map_err(|source| DbError::Io {
            path: self.dir().to_path_buf(),
            source,
        })?;
        let path = self.record_path(&udev.devpath);
        debug!("storing data for device '{}' in '{}'", udev.devpath, path.display());
        fs::write(&path, DbRecord::from(udev).render()).map_err(|source| DbError::Io { path, source })
    }
}
