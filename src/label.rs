// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Security label hooks applied around node and link creation.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Mandatory access control labeling.
//!
//! The labeling backend is supplied by the caller. [`LabelScope`] ties the
//! backend's `init`/`restore` pair to a lexical scope so the creation
//! context never leaks from one device to the next.

use std::path::Path;

/// Labeling backend for created filesystem objects.
pub trait SecurityLabeler {
    /// Prepare the backend for one device addition.
    fn init(&self);
    /// Relabel an existing object according to its mode.
    fn set_file_con(&self, path: &Path, mode: u32);
    /// Set the creation context for the next object created at `path`.
    fn set_fscreate_con(&self, path: &Path, mode: u32);
    /// Reset the creation context.
    fn restore(&self);
}

/// Backend for systems without a labeling policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLabeler;

impl SecurityLabeler for NoopLabeler {
    fn init(&self) {}
    fn set_file_con(&self, _path: &Path, _mode: u32) {}
    fn set_fscreate_con(&self, _path: &Path, _mode: u32) {}
    fn restore(&self) {}
}

/// Initialized labeler; restores the backend when dropped.
pub struct LabelScope<'a> {
    labeler: &'a dyn SecurityLabeler,
}

impl<'a> LabelScope<'a> {
    /// Initialize `labeler` for the current device.
    pub fn enter(labeler: &'a dyn SecurityLabeler) -> Self {
        labeler.init();
        Self { labeler }
    }

    /// Backend for use while the scope is alive.
    #[must_use]
    pub fn labeler(&self) -> &'a dyn SecurityLabeler {
        self.labeler
    }
}

impl Drop for LabelScope<'_> {
    fn drop(&mut self) {
        self.labeler.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<&'static str>>);

    impl SecurityLabeler for Recorder {
        fn init(&self) {
            self.0.borrow_mut().push("init");
        }
        fn set_file_con(&self, _path: &Path, _mode: u32) {
            self.0.borrow_mut().push("file");
        }
        fn set_fscreate_con(&self, _path: &Path, _mode: u32) {
            self.0.borrow_mut().push("create");
        }
        fn restore(&self) {
            self.0.borrow_mut().push("restore");
        }
    }

    fn fails_midway(labeler: &dyn SecurityLabeler) -> Result<(), ()> {
        let scope = LabelScope::enter(labeler);
        scope.labeler().set_fscreate_con(Path::new("/dev/null"), libc::S_IFCHR);
        Err(())
    }

    #[test]
    fn restore_runs_on_early_return() {
        let rec = Recorder::default();
        assert!(fails_midway(&rec).is_err());
        assert_eq!(*rec.0.borrow(), vec!["init", "create", "restore"]);
    }
}
