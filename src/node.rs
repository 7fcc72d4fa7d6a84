// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Create or preserve device special files with ownership and mode.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::{chown, FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use log::{debug, error};
use nix::sys::stat::{makedev, mknod, Mode, SFlag};
use thiserror::Error;

use crate::label::SecurityLabeler;

/// Failure while materializing a node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The special file could not be created.
    #[error("mknod({path}, {mode:#o}, {major}, {minor}) failed: {source}")]
    Mknod {
        /// Node path.
        path: PathBuf,
        /// Requested mode including the file type bits.
        mode: u32,
        /// Major number.
        major: u32,
        /// Minor number.
        minor: u32,
        /// OS error.
        source: io::Error,
    },
    /// Permission bits could not be applied.
    #[error("chmod({path}, {mode:#o}) failed: {source}")]
    Chmod {
        /// Node path.
        path: PathBuf,
        /// Requested mode.
        mode: u32,
        /// OS error.
        source: io::Error,
    },
    /// Ownership could not be applied.
    #[error("chown({path}, {uid}, {gid}) failed: {source}")]
    Chown {
        /// Node path.
        path: PathBuf,
        /// Requested uid.
        uid: u32,
        /// Requested gid.
        gid: u32,
        /// OS error.
        source: io::Error,
    },
}

/// Requested node attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpec {
    /// Permission bits with the file type bits folded in.
    pub mode: u32,
    /// Major number.
    pub major: u32,
    /// Minor number.
    pub minor: u32,
    /// Owner uid.
    pub uid: u32,
    /// Owner gid.
    pub gid: u32,
}

impl NodeSpec {
    fn dev(&self) -> u64 {
        makedev(u64::from(self.major), u64::from(self.minor)) as u64
    }
}

/// Create the special file at `path`, or keep it if it already matches.
///
/// An existing block or character node of the requested type and device
/// number is preserved so its inode stays the same; anything else at
/// `path`, including a symlink, is replaced. Mode and ownership are applied in both cases.
pub fn make_node(path: &Path, spec: &NodeSpec, labeler: &dyn SecurityLabeler) -> Result<(), NodeError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if is_same_device(&meta, spec) => {
            debug!("preserve file '{}', cause it has correct dev_t", path.display());
            labeler.set_file_con(path, meta.mode());
        }
        existing => {
            if existing.is_ok() {
                match fs::remove_file(path) {
                    Ok(()) => debug!("already present file '{}' unlinked", path.display()),
                    Err(err) => debug!("unlink({}) failed with error '{}'", path.display(), err),
                }
            }
            create(path, spec, labeler)?;
        }
    }
    apply_permissions(path, spec)
}

fn is_same_device(meta: &fs::Metadata, spec: &NodeSpec) -> bool {
    let file_type = meta.file_type();
    (file_type.is_block_device() || file_type.is_char_device())
        && meta.mode() & libc::S_IFMT == spec.mode & libc::S_IFMT
        && meta.rdev() == spec.dev()
}

fn create(path: &Path, spec: &NodeSpec, labeler: &dyn SecurityLabeler) -> Result<(), NodeError> {
    labeler.set_fscreate_con(path, spec.mode);
    let kind = SFlag::from_bits_truncate(spec.mode & libc::S_IFMT);
    let perm = Mode::from_bits_truncate(spec.mode & 0o7777);
    mknod(path, kind, perm, spec.dev() as libc::dev_t).map_err(|errno| {
        let err = NodeError::Mknod {
            path: path.to_path_buf(),
            mode: spec.mode,
            major: spec.major,
            minor: spec.minor,
            source: io::Error::from(errno),
        };
        error!("{}", err);
        err
    })
}

fn apply_permissions(path: &Path, spec: &NodeSpec) -> Result<(), NodeError> {
    let mode = spec.mode & 0o7777;
    debug!("chmod({}, {:#o})", path.display(), mode);
    fs::set_permissions(path, Permissions::from_mode(mode)).map_err(|source| {
        let err = NodeError::Chmod {
            path: path.to_path_buf(),
            mode,
            source,
        };
        error!("{}", err);
        err
    })?;

    if spec.uid != 0 || spec.gid != 0 {
        debug!("chown({}, {}, {})", path.display(), spec.uid, spec.gid);
        chown(path, Some(spec.uid), Some(spec.gid)).map_err(|source| {
            let err = NodeError::Chown {
                path: path.to_path_buf(),
                uid: spec.uid,
                gid: spec.gid,
                source,
            };
            error!("{}", err);
            err
        })?;
    }
    Ok(())
}
