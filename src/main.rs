// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point that adds one device per invocation.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! `udev-add`: materialize the node (or rename the interface) for one
//! kernel device and print the resulting environment.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use udev_node::config::parse_mode;
use udev_node::db::FileDb;
use udev_node::label::NoopLabeler;
use udev_node::naming::KernelNamer;
use udev_node::sysfs::SysfsClassDevice;
use udev_node::{DeviceAdder, DeviceType, UdevConfig, Udevice};

#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Create device nodes for kernel devices")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Directory nodes are created below.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Mount point of sysfs.
    #[arg(long, value_name = "DIR")]
    sysfs: Option<PathBuf>,
    /// Directory of the device database.
    #[arg(long, value_name = "DIR")]
    db: Option<PathBuf>,
    /// Only log what would be done.
    #[arg(long, default_value_t = false)]
    test: bool,
    /// Device type: b, c, u, p or n.
    #[arg(long = "type", value_name = "TYPE")]
    dev_type: char,
    /// Subsystem of the event.
    #[arg(long)]
    subsystem: Option<String>,
    /// Name below the root; defaults to the kernel name.
    #[arg(long)]
    name: Option<String>,
    /// Owner name or uid.
    #[arg(long)]
    owner: Option<String>,
    /// Group name or gid.
    #[arg(long)]
    group: Option<String>,
    /// Octal permission bits.
    #[arg(long, value_name = "OCTAL")]
    mode: Option<String>,
    /// Space separated symlink names.
    #[arg(long)]
    symlink: Option<String>,
    /// Number of partition nodes to create.
    #[arg(long, default_value_t = 0)]
    partitions: u32,
    /// Kernel device path, e.g. /block/sda.
    devpath: String,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = UdevConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    if let Some(sysfs) = cli.sysfs {
        config.sysfs_path = sysfs;
    }
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    config.test_run |= cli.test;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level)).init();

    let mut udev = Udevice::new(&cli.devpath, DeviceType::from_letter(cli.dev_type));
    udev.subsystem = cli.subsystem.unwrap_or_default();
    udev.name = cli.name.unwrap_or_default();
    udev.owner = cli.owner.unwrap_or_default();
    udev.group = cli.group.unwrap_or_default();
    udev.symlink = cli.symlink.unwrap_or_default();
    udev.partitions = cli.partitions;
    if let Some(mode) = cli.mode {
        udev.mode = parse_mode(&mode).ok_or_else(|| anyhow!("invalid mode '{mode}'"))?;
    }

    let class_dev = SysfsClassDevice::from_devpath(&config.sysfs_path, &udev.devpath);
    let namer = KernelNamer::new(&config);
    let db = FileDb::new(&config.db_path);
    let adder = DeviceAdder::new(&config, &namer)
        .with_labeler(&NoopLabeler)
        .with_db(&db);

    let outcome = adder
        .add_device(&mut udev, &class_dev)
        .with_context(|| format!("adding '{}'", udev.devpath))?;
    log::debug!("'{}': {:?}", udev.devpath, outcome);

    for (key, value) in udev.environment() {
        println!("{key}={value}");
    }
    Ok(())
}
