// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the device descriptor flowing through naming and node creation.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::fmt;

/// Kind of kernel device, as reported by the event glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Block device (`b`).
    Block,
    /// Character device (`c`).
    Char,
    /// Unix-socket-like character device (`u`).
    UnixChar,
    /// Named pipe (`p`).
    Fifo,
    /// Network interface (`n`).
    Net,
    /// Any other type letter; always rejected by the orchestrator.
    Unknown(char),
}

impl DeviceType {
    /// Map the single-letter type code used by the event glue.
    #[must_use]
    pub fn from_letter(letter: char) -> Self {
        match letter {
            'b' => Self::Block,
            'c' => Self::Char,
            'u' => Self::UnixChar,
            'p' => Self::Fifo,
            'n' => Self::Net,
            other => Self::Unknown(other),
        }
    }

    /// Single-letter type code.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::Block => 'b',
            Self::Char => 'c',
            Self::UnixChar => 'u',
            Self::Fifo => 'p',
            Self::Net => 'n',
            Self::Unknown(other) => other,
        }
    }

    /// File type bits folded into the node mode, if this type has a node.
    ///
    /// `u` devices get a character node and `p` devices a FIFO, so both are
    /// materialized like `b` and `c` rather than only being named.
    #[must_use]
    pub fn file_type_bits(self) -> Option<u32> {
        match self {
            Self::Block => Some(libc::S_IFBLK),
            Self::Char | Self::UnixChar => Some(libc::S_IFCHR),
            Self::Fifo => Some(libc::S_IFIFO),
            Self::Net | Self::Unknown(_) => None,
        }
    }

    /// True when the kernel exposes a `dev` attribute for this type.
    ///
    /// FIFOs have none; their node uses the numbers already on the record.
    #[must_use]
    pub fn has_dev_numbers(self) -> bool {
        matches!(self, Self::Block | Self::Char | Self::UnixChar)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Mutable record describing one kernel device.
///
/// Built by the event glue, enriched by a [`crate::naming::Namer`] and
/// finalized by [`crate::add::DeviceAdder::add_device`], which writes
/// `devname` (and for renamed interfaces `devpath`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Udevice {
    /// Name reported by the kernel.
    pub kernel_name: String,
    /// Resolved name relative to the root; may contain `/`.
    pub name: String,
    /// Kernel device path, e.g. `/class/net/eth0`.
    pub devpath: String,
    /// Subsystem of the event, when known.
    pub subsystem: String,
    /// Final device file path or interface name.
    pub devname: String,
    /// Device kind.
    pub dev_type: DeviceType,
    /// Major device number.
    pub major: u32,
    /// Minor device number.
    pub minor: u32,
    /// Permission bits; the file type bits are OR'ed in on creation.
    pub mode: u32,
    /// Numeric id or user name.
    pub owner: String,
    /// Numeric id or group name.
    pub group: String,
    /// Space separated list of link names relative to the root.
    pub symlink: String,
    /// Number of partition nodes to create next to the primary node.
    pub partitions: u32,
    /// Log intended actions without touching the system.
    pub test_run: bool,
}

impl Udevice {
    /// Create a descriptor for `devpath`; the kernel name is its last segment.
    #[must_use]
    pub fn new(devpath: &str, dev_type: DeviceType) -> Self {
        let kernel_name = devpath.rsplit('/').next().unwrap_or_default().to_owned();
        Self {
            kernel_name,
            name: String::new(),
            devpath: devpath.to_owned(),
            subsystem: String::new(),
            devname: String::new(),
            dev_type,
            major: 0,
            minor: 0,
            mode: 0,
            owner: String::new(),
            group: String::new(),
            symlink: String::new(),
            partitions: 0,
            test_run: false,
        }
    }

    /// Iterate over the requested symlink names.
    pub fn symlinks(&self) -> impl Iterator<Item = &str> {
        self.symlink.split_whitespace()
    }

    /// Variables exposed to helpers run after the addition.
    #[must_use]
    pub fn environment(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![("ACTION", "add".to_owned()), ("DEVPATH", self.devpath.clone())];
        if !self.subsystem.is_empty() {
            env.push(("SUBSYSTEM", self.subsystem.clone()));
        }
        if !self.devname.is_empty() {
            env.push(("DEVNAME", self.devname.clone()));
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_name_is_last_devpath_segment() {
        let udev = Udevice::new("/block/sda/sda1", DeviceType::Block);
        assert_eq!(udev.kernel_name, "sda1");
        assert_eq!(udev.devpath, "/block/sda/sda1");
    }

    #[test]
    fn type_letters_map_both_ways() {
        for letter in ['b', 'c', 'u', 'p', 'n', 'x'] {
            assert_eq!(DeviceType::from_letter(letter).letter(), letter);
        }
        assert_eq!(DeviceType::from_letter('x'), DeviceType::Unknown('x'));
        assert_eq!(DeviceType::UnixChar.file_type_bits(), Some(libc::S_IFCHR));
        assert_eq!(DeviceType::Net.file_type_bits(), None);
    }

    #[test]
    fn unix_char_and_fifo_types_get_nodes() {
        assert_eq!(DeviceType::Fifo.file_type_bits(), Some(libc::S_IFIFO));
        assert!(DeviceType::UnixChar.has_dev_numbers());
        assert!(!DeviceType::Fifo.has_dev_numbers());
        assert!(!DeviceType::Net.has_dev_numbers());
    }

    #[test]
    fn environment_includes_devname_once_set() {
        let mut udev = Udevice::new("/class/net/eth0", DeviceType::Net);
        assert!(!udev.environment().iter().any(|(k, _)| *k == "DEVNAME"));
        udev.devname = "lan0".into();
        udev.subsystem = "net".into();
        let env = udev.environment();
        assert!(env.contains(&("DEVNAME", "lan0".to_owned())));
        assert!(env.contains(&("SUBSYSTEM", "net".to_owned())));
        assert!(env.contains(&("DEVPATH", "/class/net/eth0".to_owned())));
    }
}
