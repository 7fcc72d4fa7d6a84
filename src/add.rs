// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Sequence naming, node creation, persistence and interface renames per device.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Device addition.
//!
//! [`DeviceAdder::add_device`] is the single entry point called once per
//! kernel "add" event. Block and character devices get a node below the
//! configured root plus optional partition nodes and relative symlinks;
//! network interfaces are renamed to their resolved name. Only failures of
//! the primary node, the naming policy or the rename are fatal.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::UdevConfig;
use crate::db::{DeviceDb, NullDb};
use crate::device::{DeviceType, Udevice};
use crate::ids::{resolve_group, resolve_owner, IdResolver, SystemIds};
use crate::label::{LabelScope, NoopLabeler, SecurityLabeler};
use crate::naming::{Namer, NamingError};
use crate::netif::{rename_net_if, NetifError};
use crate::node::{make_node, NodeError, NodeSpec};
use crate::path::{create_path, join_root, partition_path, relative_link_target};
use crate::sysfs::{resolve_major_minor, ClassDevice};

/// Fatal failure of a device addition.
#[derive(Debug, Error)]
pub enum AddError {
    /// The device type letter is not handled.
    #[error("unknown device type '{0}'")]
    UnknownType(char),
    /// The naming policy rejected the device.
    #[error(transparent)]
    Naming(#[from] NamingError),
    /// The primary node could not be created.
    #[error(transparent)]
    Node(#[from] NodeError),
    /// The interface could not be renamed.
    #[error(transparent)]
    Netif(#[from] NetifError),
}

/// What a successful addition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The kernel object has no `dev` attribute; nothing was done.
    NoDeviceFile,
    /// The primary node exists with the requested attributes.
    NodeCreated,
    /// The interface was renamed to the resolved name.
    Renamed,
    /// The interface already carries the resolved name.
    Unchanged,
}

/// Device addition with its collaborators.
pub struct DeviceAdder<'a> {
    config: &'a UdevConfig,
    namer: &'a dyn Namer,
    ids: &'a dyn IdResolver,
    labeler: &'a dyn SecurityLabeler,
    db: &'a dyn DeviceDb,
}

impl<'a> DeviceAdder<'a> {
    /// Adder using system id lookup, no labeling and no persistence.
    #[must_use]
    pub fn new(config: &'a UdevConfig, namer: &'a dyn Namer) -> Self {
        Self {
            config,
            namer,
            ids: &SystemIds,
            labeler: &NoopLabeler,
            db: &NullDb,
        }
    }

    /// Replace the owner/group lookup.
    #[must_use]
    pub fn with_ids(mut self, ids: &'a dyn IdResolver) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the security labeling backend.
    #[must_use]
    pub fn with_labeler(mut self, labeler: &'a dyn SecurityLabeler) -> Self {
        self.labeler = labeler;
        self
    }

    /// Replace the device database.
    #[must_use]
    pub fn with_db(mut self, db: &'a dyn DeviceDb) -> Self {
        self.db = db;
        self
    }

    /// Add one device, writing `devname` (and `devpath` after a rename).
    pub fn add_device(&self, udev: &mut Udevice, class_dev: &dyn ClassDevice) -> Result<AddOutcome, AddError> {
        if let DeviceType::Unknown(letter) = udev.dev_type {
            error!("unknown device type '{}' for '{}'", letter, udev.devpath);
            return Err(AddError::UnknownType(letter));
        }
        if self.config.test_run {
            udev.test_run = true;
        }
        match udev.dev_type {
            DeviceType::Net => self.add_netif(udev, class_dev),
            _ => self.add_node(udev, class_dev),
        }
    }

    fn name(&self, udev: &mut Udevice, class_dev: &dyn ClassDevice) -> Result<(), AddError> {
        self.namer.name_device(udev, class_dev).map_err(|err| {
            error!("{}", err);
            AddError::from(err)
        })?;
        debug!("adding name='{}'", udev.name);
        Ok(())
    }

    fn add_node(&self, udev: &mut Udevice, class_dev: &dyn ClassDevice) -> Result<AddOutcome, AddError> {
        if udev.dev_type.has_dev_numbers() && !resolve_major_minor(class_dev, udev) {
            debug!("no dev-file found for '{}', do nothing", udev.devpath);
            return Ok(AddOutcome::NoDeviceFile);
        }
        self.name(udev, class_dev)?;

        let scope = LabelScope::enter(self.labeler);
        let filename = self.create_node(udev, scope.labeler())?;

        if let Err(err) = self.db.record(udev) {
            warn!(
                "recording '{}' failed, but the node was created anyway; \
                 remove might not work for custom names: {}",
                udev.devpath, err
            );
        }
        udev.devname = filename.to_string_lossy().into_owned();
        Ok(AddOutcome::NodeCreated)
    }

    fn create_node(&self, udev: &mut Udevice, labeler: &dyn SecurityLabeler) -> Result<PathBuf, AddError> {
        let Some(type_bits) = udev.dev_type.file_type_bits() else {
            return Err(AddError::UnknownType(udev.dev_type.letter()));
        };
        udev.mode |= type_bits;
        let filename = join_root(&self.config.root, &udev.name);

        if udev.name.contains('/') && !udev.test_run {
            if let Err(err) = create_path(&filename) {
                warn!("creating parent directories of '{}' failed: {}", filename.display(), err);
            }
        }

        let spec = NodeSpec {
            mode: udev.mode,
            major: udev.major,
            minor: udev.minor,
            uid: resolve_owner(&udev.owner, self.ids),
            gid: resolve_group(&udev.group, self.ids),
        };

        if udev.test_run {
            info!(
                "creating device node '{}', major = '{}', minor = '{}', mode = '{:#o}', uid = '{}', gid = '{}'",
                filename.display(),
                spec.major,
                spec.minor,
                spec.mode,
                spec.uid,
                spec.gid
            );
        } else {
            info!("creating device node '{}'", filename.display());
            make_node(&filename, &spec, labeler)?;
        }

        if udev.partitions > 0 {
            info!("creating device partition nodes '{}[1-{}]'", filename.display(), udev.partitions);
            if !udev.test_run {
                self.create_partitions(&filename, &spec, udev.partitions, labeler);
            }
        }

        for link in udev.symlinks() {
            self.create_symlink(&udev.name, link, udev.test_run, labeler);
        }
        Ok(filename)
    }

    fn create_partitions(&self, filename: &Path, spec: &NodeSpec, count: u32, labeler: &dyn SecurityLabeler) {
        for i in 1..=count {
            let Some(minor) = spec.minor.checked_add(i) else {
                warn!("partition {} of '{}' overflows the minor number", i, filename.display());
                break;
            };
            let path = partition_path(filename, i);
            let part = NodeSpec { minor, ..*spec };
            if let Err(err) = make_node(&path, &part, labeler) {
                warn!("partition node '{}' not created: {}", path.display(), err);
            }
        }
    }

    fn create_symlink(&self, name: &str, link: &str, test_run: bool, labeler: &dyn SecurityLabeler) {
        let linkpath = join_root(&self.config.root, link);
        debug!("symlink '{}' to node '{}' requested", linkpath.display(), name);
        if !test_run && link.contains('/') {
            if let Err(err) = create_path(&linkpath) {
                warn!("creating parent directories of '{}' failed: {}", linkpath.display(), err);
            }
        }

        let target = relative_link_target(name, link);
        debug!("symlink({}, {})", target, linkpath.display());
        if test_run {
            return;
        }

        labeler.set_fscreate_con(&linkpath, libc::S_IFLNK);
        match fs::remove_file(&linkpath) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => debug!("unlink({}) failed with error '{}'", linkpath.display(), err),
        }
        if let Err(err) = symlink(&target, &linkpath) {
            warn!("symlink({}, {}) failed with error '{}'", target, linkpath.display(), err);
        }
    }

    fn add_netif(&self, udev: &mut Udevice, class_dev: &dyn ClassDevice) -> Result<AddOutcome, AddError> {
        self.name(udev, class_dev)?;
        let _scope = LabelScope::enter(self.labeler);

        if udev.name == udev.kernel_name {
            udev.devname = udev.kernel_name.clone();
            return Ok(AddOutcome::Unchanged);
        }

        rename_net_if(&udev.kernel_name, &udev.name, udev.test_run)?;

        // the kernel sends no further event for the old name, so the
        // devpath is rewritten to the new one here
        if let Some(pos) = udev.devpath.rfind('/') {
            udev.devpath.truncate(pos + 1);
            udev.devpath.push_str(&udev.name);
        }
        udev.devname = udev.name.clone();
        Ok(AddOutcome::Renamed)
    }
}
