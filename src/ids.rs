// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Resolve owner and group strings to numeric ids.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;

use log::{debug, warn};
use nix::unistd::{Group, User};

/// Name to id lookup for users and groups.
pub trait IdResolver {
    /// Uid of the named user, if known.
    fn user_id(&self, name: &str) -> Option<u32>;
    /// Gid of the named group, if known.
    fn group_id(&self, name: &str) -> Option<u32>;
}

/// Lookup through the system user and group databases.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIds;

impl IdResolver for SystemIds {
    fn user_id(&self, name: &str) -> Option<u32> {
        match User::from_name(name) {
            Ok(user) => user.map(|u| u.uid.as_raw()),
            Err(err) => {
                debug!("user lookup for '{}' failed: {}", name, err);
                None
            }
        }
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        match Group::from_name(name) {
            Ok(group) => group.map(|g| g.gid.as_raw()),
            Err(err) => {
                debug!("group lookup for '{}' failed: {}", name, err);
                None
            }
        }
    }
}

/// Lookup by scanning passwd-style files directly.
#[derive(Debug, Clone)]
pub struct PasswdFileIds {
    /// Users file, `/etc/passwd` by default.
    pub passwd: PathBuf,
    /// Groups file, `/etc/group` by default.
    pub group: PathBuf,
}

impl Default for PasswdFileIds {
    fn default() -> Self {
        Self {
            passwd: PathBuf::from("/etc/passwd"),
            group: PathBuf::from("/etc/group"),
        }
    }
}

impl IdResolver for PasswdFileIds {
    fn user_id(&self, name: &str) -> Option<u32> {
        id_from_file(name, &self.passwd)
    }

    fn group_id(&self, name: &str) -> Option<u32> {
        id_from_file(name, &self.group)
    }
}

fn id_from_file(name: &str, path: &std::path::Path) -> Option<u32> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!("can't open '{}' as db file: {}", path.display(), err);
            return None;
        }
    };
    id_from_db(name, &contents)
}

/// Id of `name` in `name:password:id:...` formatted text.
///
/// The first line naming `name` decides; a non-numeric id there is a miss.
#[must_use]
pub fn id_from_db(name: &str, contents: &str) -> Option<u32> {
    for line in contents.lines() {
        let mut fields = line.split(':');
        let (Some(entry), Some(_password), Some(id)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if entry == name {
            let id = id.parse().ok();
            debug!("id for '{}' is {:?}", name, id);
            return id;
        }
    }
    None
}

/// Uid for an owner string: empty is root, digits are literal, else a lookup.
#[must_use]
pub fn resolve_owner(owner: &str, resolver: &dyn IdResolver) -> u32 {
    resolve(owner, "user", |name| resolver.user_id(name))
}

/// Gid for a group string: empty is root, digits are literal, else a lookup.
#[must_use]
pub fn resolve_group(group: &str, resolver: &dyn IdResolver) -> u32 {
    resolve(group, "group", |name| resolver.group_id(name))
}

fn resolve(text: &str, kind: &str, lookup: impl Fn(&str) -> Option<u32>) -> u32 {
    if text.is_empty() {
        return 0;
    }
    if let Ok(id) = text.parse::<u32>() {
        return id;
    }
    match lookup(text) {
        Some(id) => id,
        None => {
            warn!("specified {} unknown '{}'", kind, text);
            0
        }
    }
}
