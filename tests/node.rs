// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate create-or-preserve behaviour of device nodes.
// Author: Lukas Bower

use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;

use nix::sys::stat::{major, makedev, minor, mknod, Mode, SFlag};
use udev_node::label::NoopLabeler;
use udev_node::node::{make_node, NodeError, NodeSpec};

fn can_mknod(dir: &Path) -> bool {
    let probe = dir.join(".probe");
    let ok = mknod(probe.as_path(), SFlag::S_IFCHR, Mode::from_bits_truncate(0o600), makedev(1, 3)).is_ok();
    let _ = fs::remove_file(&probe);
    ok
}

fn char_spec(major: u32, minor: u32, perm: u32) -> NodeSpec {
    NodeSpec {
        mode: libc::S_IFCHR | perm,
        major,
        minor,
        uid: 0,
        gid: 0,
    }
}

#[test]
fn matching_node_keeps_its_inode() {
    let dir = tempfile::tempdir().expect("tempdir");
    if !can_mknod(dir.path()) {
        eprintln!("skipping: no CAP_MKNOD");
        return;
    }
    let path = dir.path().join("null");
    make_node(&path, &char_spec(1, 3, 0o666), &NoopLabeler).expect("first");
    let first = fs::metadata(&path).expect("stat");
    make_node(&path, &char_spec(1, 3, 0o640), &NoopLabeler).expect("second");
    let second = fs::metadata(&path).expect("stat");

    assert_eq!(first.ino(), second.ino());
    assert!(second.file_type().is_char_device());
    assert_eq!(second.permissions().mode() & 0o7777, 0o640);
    assert_eq!((major(second.rdev()), minor(second.rdev())), (1, 3));
}

#[test]
fn changed_device_number_replaces_node() {
    let dir = tempfile::tempdir().expect("tempdir");
    if !can_mknod(dir.path()) {
        eprintln!("skipping: no CAP_MKNOD");
        return;
    }
    let path = dir.path().join("sda");
    make_node(&path, &char_spec(8, 0, 0o660), &NoopLabeler).expect("first");
    // keep the old inode alive so its number cannot be reused
    let old = dir.path().join("sda.old");
    fs::hard_link(&path, &old).expect("link");

    make_node(&path, &char_spec(8, 16, 0o660), &NoopLabeler).expect("second");
    let meta = fs::metadata(&path).expect("stat");
    assert_ne!(meta.ino(), fs::metadata(&old).expect("stat").ino());
    assert_eq!((major(meta.rdev()), minor(meta.rdev())), (8, 16));
}

#[test]
fn block_node_replaces_char_node_with_same_numbers() {
    let dir = tempfile::tempdir().expect("tempdir");
    if !can_mknod(dir.path()) {
        eprintln!("skipping: no CAP_MKNOD");
        return;
    }
    let path = dir.path().join("loop0");
    make_node(&path, &char_spec(7, 0, 0o660), &NoopLabeler).expect("char");
    let block = NodeSpec {
        mode: libc::S_IFBLK | 0o660,
        ..char_spec(7, 0, 0o660)
    };
    make_node(&path, &block, &NoopLabeler).expect("block");
    let meta = fs::metadata(&path).expect("stat");
    assert!(meta.file_type().is_block_device());
    assert_eq!((major(meta.rdev()), minor(meta.rdev())), (7, 0));
}

#[test]
fn regular_file_is_replaced_by_fifo() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("initctl");
    fs::write(&path, b"stale").expect("write");
    let spec = NodeSpec {
        mode: libc::S_IFIFO | 0o620,
        major: 0,
        minor: 0,
        uid: 0,
        gid: 0,
    };
    make_node(&path, &spec, &NoopLabeler).expect("fifo");
    let meta = fs::symlink_metadata(&path).expect("stat");
    assert!(meta.file_type().is_fifo());
    assert_eq!(meta.permissions().mode() & 0o7777, 0o620);
}

#[test]
fn dangling_symlink_is_replaced_by_node() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cdrom");
    std::os::unix::fs::symlink("hdc", &path).expect("symlink");
    let spec = NodeSpec {
        mode: libc::S_IFIFO | 0o640,
        major: 0,
        minor: 0,
        uid: 0,
        gid: 0,
    };
    make_node(&path, &spec, &NoopLabeler).expect("fifo");
    let meta = fs::symlink_metadata(&path).expect("stat");
    assert!(meta.file_type().is_fifo());
    assert!(!dir.path().join("hdc").exists());
}

#[test]
fn ownership_is_applied_when_non_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fifo");
    let uid = nix::unistd::getuid().as_raw();
    let gid = nix::unistd::getgid().as_raw();
    let spec = NodeSpec {
        mode: libc::S_IFIFO | 0o600,
        major: 0,
        minor: 0,
        uid,
        gid,
    };
    make_node(&path, &spec, &NoopLabeler).expect("fifo");
    let meta = fs::metadata(&path).expect("stat");
    assert_eq!((meta.uid(), meta.gid()), (uid, gid));
}

#[test]
fn missing_parent_fails_with_mknod_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("no/such/dir/fifo");
    let spec = NodeSpec {
        mode: libc::S_IFIFO | 0o600,
        major: 0,
        minor: 0,
        uid: 0,
        gid: 0,
    };
    let err = make_node(&path, &spec, &NoopLabeler).expect_err("mknod");
    match err {
        NodeError::Mknod { path: failed, source, .. } => {
            assert_eq!(failed, path);
            assert_eq!(source.raw_os_error(), Some(libc::ENOENT));
        }
        other => panic!("unexpected error {other}"),
    }
}
