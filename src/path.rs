// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Plan node, partition and symlink paths below the device root.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use log::debug;

/// Maximum path length including the terminating NUL.
pub const PATH_SIZE: usize = libc::PATH_MAX as usize;

/// Join `relative` below `root`, truncated to fit [`PATH_SIZE`].
#[must_use]
pub fn join_root(root: &Path, relative: &str) -> PathBuf {
    let mut buf = root.as_os_str().as_bytes().to_vec();
    while buf.last() == Some(&b'/') {
        buf.pop();
    }
    buf.push(b'/');
    buf.extend_from_slice(relative.as_bytes());
    bounded(buf)
}

/// Partition node path: `node` with the decimal partition number appended.
#[must_use]
pub fn partition_path(node: &Path, partition: u32) -> PathBuf {
    let mut buf = node.as_os_str().as_bytes().to_vec();
    buf.extend_from_slice(partition.to_string().as_bytes());
    bounded(buf)
}

// Cuts before a UTF-8 continuation byte are moved back to the start of
// that character, so a UTF-8 name stays valid UTF-8.
fn bounded(mut buf: Vec<u8>) -> PathBuf {
    if buf.len() >= PATH_SIZE {
        let mut cut = PATH_SIZE - 1;
        while cut > 0 && buf[cut] & 0xC0 == 0x80 {
            cut -= 1;
        }
        debug!("path truncated to {} bytes", cut);
        buf.truncate(cut);
    }
    PathBuf::from(OsString::from_vec(buf))
}

/// Create the parent directories of `path`.
///
/// A directory created concurrently by another caller counts as success.
pub fn create_path(path: &Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    debug!("mkdir -p '{}'", parent.display());
    fs::create_dir_all(parent)
}

/// Link target for `link` pointing at `name`, relative to the link's directory.
///
/// Both names are relative to the device root. The shared leading
/// directories are dropped and every directory left in `link` adds a `../`.
#[must_use]
pub fn relative_link_target(name: &str, link: &str) -> String {
    let name_bytes = name.as_bytes();
    let link_bytes = link.as_bytes();
    let mut i = 0;
    let mut tail = 0;
    while i < name_bytes.len() && i < link_bytes.len() && name_bytes[i] == link_bytes[i] {
        if name_bytes[i] == b'/' {
            tail = i + 1;
        }
        i += 1;
    }
    let ups = link_bytes[i..].iter().filter(|&&b| b == b'/').count();
    let mut target = "../".repeat(ups);
    target.push_str(&name[tail..]);
    target
}
