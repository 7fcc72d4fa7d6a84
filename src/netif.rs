// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Rename kernel network interfaces through SIOCSIFNAME.
// Author: Lukas Bower

use std::io;
use std::os::fd::AsRawFd;

use log::{debug, error};
use nix::sys::socket::{socket, AddressFamily, SockFlag, SockType};
use thiserror::Error;

use self::sys::IfRenameReq;

/// Failure while renaming an interface.
#[derive(Debug, Error)]
pub enum NetifError {
    /// Name does not fit the kernel's interface name buffer.
    #[error("invalid interface name '{0}'")]
    InvalidName(String),
    /// Control socket could not be opened.
    #[error("error opening socket: {0}")]
    Socket(#[source] io::Error),
    /// Kernel refused the rename.
    #[error("error changing net interface name from '{from}' to '{to}': {source}")]
    Rename {
        /// Current interface name.
        from: String,
        /// Requested interface name.
        to: String,
        /// OS error.
        source: io::Error,
    },
}

mod sys {
    /// `struct ifreq` as used by SIOCSIFNAME: the old name followed by the
    /// new name in the request union.
    #[repr(C)]
    pub struct IfRenameReq {
        pub name: [libc::c_char; libc::IFNAMSIZ],
        pub newname: [libc::c_char; libc::IFNAMSIZ],
        pub pad: [u8; 8],
    }

    nix::ioctl_write_ptr_bad!(set_if_name, libc::SIOCSIFNAME, IfRenameReq);
}

fn ifname(name: &str) -> Result<[libc::c_char; libc::IFNAMSIZ], NetifError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ || bytes.contains(&0) {
        return Err(NetifError::InvalidName(name.to_owned()));
    }
    let mut buf = [0 as libc::c_char; libc::IFNAMSIZ];
    for (dst, src) in buf.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }
    Ok(buf)
}

/// Rename interface `from` to `to`. A no-op in test mode.
pub fn rename_net_if(from: &str, to: &str, test_run: bool) -> Result<(), NetifError> {
    debug!("changing net interface name from '{}' to '{}'", from, to);
    if test_run {
        return Ok(());
    }

    let req = IfRenameReq {
        name: ifname(from)?,
        newname: ifname(to)?,
        pad: [0; 8],
    };

    let sock = socket(AddressFamily::Inet, SockType::Datagram, SockFlag::SOCK_CLOEXEC, None).map_err(|errno| {
        let err = NetifError::Socket(io::Error::from(errno));
        error!("{}", err);
        err
    })?;

    // SAFETY: `req` is a fully initialized ifreq that outlives the call and
    // `sock` stays open until the end of this function.
    unsafe { sys::set_if_name(sock.as_raw_fd(), &req) }.map_err(|errno| {
        let err = NetifError::Rename {
            from: from.to_owned(),
            to: to.to_owned(),
            source: io::Error::from(errno),
        };
        error!("{}", err);
        err
    })?;
    Ok(())
}
