// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Read class device attributes and resolve device numbers.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::device::Udevice;

/// Attribute source for one class device.
pub trait ClassDevice {
    /// Value of the named attribute, without the trailing newline.
    fn attr(&self, name: &str) -> Option<String>;
}

/// Class device backed by a sysfs directory.
#[derive(Debug, Clone)]
pub struct SysfsClassDevice {
    path: PathBuf,
}

impl SysfsClassDevice {
    /// Attributes are read from files inside `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Class device for `devpath` below a sysfs mount point.
    #[must_use]
    pub fn from_devpath(sysfs: &Path, devpath: &str) -> Self {
        Self::new(sysfs.join(devpath.trim_start_matches('/')))
    }

    /// Directory holding the attributes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClassDevice for SysfsClassDevice {
    fn attr(&self, name: &str) -> Option<String> {
        let value = fs::read_to_string(self.path.join(name)).ok()?;
        Some(value.trim_end_matches('\n').to_owned())
    }
}

impl ClassDevice for HashMap<String, String> {
    fn attr(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Parse the `dev` attribute format `<major>:<minor>`.
///
/// Leading blanks before each number are skipped and anything after the
/// minor digits is ignored.
#[must_use]
pub fn parse_dev(value: &str) -> Option<(u32, u32)> {
    let (major, rest) = value.trim_start().split_once(':')?;
    let rest = rest.trim_start();
    let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let major = major.parse().ok()?;
    let minor = rest[..digits].parse().ok()?;
    Some((major, minor))
}

/// Fill `major`/`minor` from the class device's `dev` attribute.
///
/// Returns `false` without touching the descriptor when the attribute is
/// missing or malformed, meaning the kernel object has no device file.
pub fn resolve_major_minor(class_dev: &dyn ClassDevice, udev: &mut Udevice) -> bool {
    let Some(value) = class_dev.attr("dev") else {
        debug!("no 'dev' attribute for '{}'", udev.devpath);
        return false;
    };
    debug!("dev='{}'", value);
    match parse_dev(&value) {
        Some((major, minor)) => {
            udev.major = major;
            udev.minor = minor;
            debug!("found major={}, minor={}", major, minor);
            true
        }
        None => {
            debug!("malformed 'dev' attribute '{}' for '{}'", value, udev.devpath);
            false
        }
    }
}
