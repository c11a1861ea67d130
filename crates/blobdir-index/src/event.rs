use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::index::DirectoryIndex;

/// How a directory entry changed between two polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

/// A single observed change to a directory entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Entry name relative to the watched directory.
    pub name: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(name: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn added(name: impl Into<String>) -> Self {
        Self::new(name, ChangeKind::Added)
    }

    pub fn removed(name: impl Into<String>) -> Self {
        Self::new(name, ChangeKind::Removed)
    }

    pub fn modified(name: impl Into<String>) -> Self {
        Self::new(name, ChangeKind::Modified)
    }
}

/// Receives batches of changes from the watcher.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, batch: &[ChangeEvent]);
}

/// Keeps a [`DirectoryIndex`] in step with observed changes.
///
/// `Added` and `Removed` update the name list and the count. `Modified`
/// leaves both untouched: a content change does not alter membership, and a
/// rename arrives as a `Removed` plus an `Added`.
pub struct IndexUpdater {
    index: Arc<DirectoryIndex>,
}

impl IndexUpdater {
    pub fn new(index: Arc<DirectoryIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Arc<DirectoryIndex> {
        &self.index
    }
}

impl ChangeListener for IndexUpdater {
    fn on_change(&self, batch: &[ChangeEvent]) {
        for event in batch {
            debug!(name = %event.name, kind = %event.kind, "changed file");
            match event.kind {
                ChangeKind::Added => self.index.add_name(&event.name),
                ChangeKind::Removed => {
                    self.index.remove_name(&event.name);
                }
                ChangeKind::Modified => trace!(name = %event.name, "modification ignored by index"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updater_applies_adds_and_removes() {
        let index = Arc::new(DirectoryIndex::from_names(["old.txt"]));
        let updater = IndexUpdater::new(Arc::clone(&index));

        updater.on_change(&[
            ChangeEvent::added("new.txt"),
            ChangeEvent::removed("old.txt"),
        ]);

        assert_eq!(index.names(), vec!["new.txt"]);
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn modified_is_a_no_op() {
        let index = Arc::new(DirectoryIndex::from_names(["a.txt"]));
        let updater = IndexUpdater::new(Arc::clone(&index));

        updater.on_change(&[ChangeEvent::modified("a.txt")]);

        assert_eq!(index.names(), vec!["a.txt"]);
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn kind_display() {
        assert_eq!(ChangeKind::Added.to_string(), "added");
        assert_eq!(ChangeKind::Removed.to_string(), "removed");
        assert_eq!(ChangeKind::Modified.to_string(), "modified");
    }
}
