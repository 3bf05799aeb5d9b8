//! Per-mirror mutual exclusion.
//!
//! Two clone or fetch processes running against the same bare repository
//! corrupt it, so every synchronization holds the lock for its mirror path
//! until it finishes. Locks for distinct paths are independent.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};

/// The set of mirror paths currently being synchronized.
#[derive(Debug, Default)]
pub struct PathLocks {
    busy: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Held while a mirror is being synchronized; releases the path on drop.
#[derive(Debug)]
pub struct PathGuard<'a> {
    locks: &'a PathLocks,
    path: String,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until no other holder has `path`, then claims it.
    pub fn acquire(&self, path: &str) -> PathGuard<'_> {
        let mut busy = self.table();
        while busy.contains(path) {
            busy = match self.released.wait(busy) {
                Ok(busy) => busy,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        busy.insert(path.to_string());
        PathGuard {
            locks: self,
            path: path.to_string(),
        }
    }

    /// True if some holder currently has `path`.
    pub fn is_held(&self, path: &str) -> bool {
        self.table().contains(path)
    }

    // The table is only mutated by insert/remove, which cannot leave it
    // inconsistent, so a poisoned lock is still safe to use.
    fn table(&self) -> MutexGuard<'_, HashSet<String>> {
        match self.busy.lock() {
            Ok(busy) => busy,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        self.locks.table().remove(&self.path);
        self.locks.released.notify_all();
    }
}
