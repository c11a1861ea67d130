use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use tracing::trace;

/// Per-filename mutual exclusion for mutating operations.
///
/// A guard claims a set of names atomically: it waits until none of them is
/// held, then holds all of them until dropped. Claiming every name at once
/// means two renames in opposite directions cannot deadlock.
#[derive(Debug, Default)]
pub struct NameLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until all `names` are free, then claim them.
    pub fn acquire(&self, names: &[&str]) -> NameGuard<'_> {
        let wanted: Vec<String> = names
            .iter()
            .map(|n| n.to_string())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut held = self.held.lock().expect("lock poisoned");
        while wanted.iter().any(|n| held.contains(n)) {
            trace!(names = ?wanted, "waiting for name lock");
            held = self.released.wait(held).expect("lock poisoned");
        }
        held.extend(wanted.iter().cloned());

        NameGuard {
            locks: self,
            names: wanted,
        }
    }

    /// Returns `true` if `name` is currently claimed.
    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().expect("lock poisoned").contains(name)
    }
}

/// Releases its names when dropped.
#[derive(Debug)]
pub struct NameGuard<'a> {
    locks: &'a NameLocks,
    names: Vec<String>,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock().expect("lock poisoned");
        for name in &self.names {
            held.remove(name);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
