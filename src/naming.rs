// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Naming policy seam and the default kernel-name policy.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use log::debug;
use thiserror::Error;

use crate::config::UdevConfig;
use crate::device::Udevice;
use crate::sysfs::ClassDevice;

/// The naming policy could not name a device.
#[derive(Debug, Error)]
#[error("naming failed for '{devpath}': {reason}")]
pub struct NamingError {
    /// Device path of the rejected device.
    pub devpath: String,
    /// Policy specific reason.
    pub reason: String,
}

/// Decides name, ownership, mode, symlinks and partitions for a device.
pub trait Namer {
    /// Fill the naming fields of `udev`.
    fn name_device(&self, udev: &mut Udevice, class_dev: &dyn ClassDevice) -> Result<(), NamingError>;
}

/// Keeps the kernel name and fills unset fields from configuration defaults.
#[derive(Debug, Clone)]
pub struct KernelNamer {
    mode: u32,
    owner: String,
    group: String,
}

impl KernelNamer {
    /// Defaults taken from `config`.
    #[must_use]
    pub fn new(config: &UdevConfig) -> Self {
        Self {
            mode: config.default_mode,
            owner: config.default_owner.clone(),
            group: config.default_group.clone(),
        }
    }
}

impl Namer for KernelNamer {
    fn name_device(&self, udev: &mut Udevice, _class_dev: &dyn ClassDevice) -> Result<(), NamingError> {
        if udev.kernel_name.is_empty() && udev.name.is_empty() {
            return Err(NamingError {
                devpath: udev.devpath.clone(),
                reason: "no kernel name".into(),
            });
        }
        if udev.name.is_empty() {
            udev.name = udev.kernel_name.clone();
        }
        if udev.mode == 0 {
            udev.mode = self.mode;
        }
        if udev.owner.is_empty() {
            udev.owner = self.owner.clone();
        }
        if udev.group.is_empty() {
            udev.group = self.group.clone();
        }
        debug!(
            "default naming for '{}': name='{}' mode={:#o}",
            udev.devpath, udev.name, udev.mode
        );
        Ok(())
    }
}
