// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Root library for the device node materialization stage.
// Author: Lukas Bower
#![warn(missing_docs)]

//! Device node materialization for a userspace device manager.
//!
//! Given a kernel device and the decisions of a naming policy, this crate
//! creates the special file below the configured root, applies ownership
//! and permissions, creates partition nodes and relative symlinks, and
//! renames network interfaces.

/// Orchestration of a single device addition.
pub mod add;
/// Root, database and test-mode configuration.
pub mod config;
/// Device record persistence.
pub mod db;
/// Device descriptor and type codes.
pub mod device;
/// Owner and group id resolution.
pub mod ids;
/// Security labeling hooks.
pub mod label;
/// Naming policy seam.
pub mod naming;
/// Network interface renaming.
pub mod netif;
/// Special file creation.
pub mod node;
/// Path and symlink planning.
pub mod path;
/// Class device attributes and device number resolution.
pub mod sysfs;

pub use add::{AddError, AddOutcome, DeviceAdder};
pub use config::UdevConfig;
pub use device::{DeviceType, Udevice};
