//! The in-memory directory index.
//!
//! [`DirectoryIndex`] serves `count` and name queries without touching the
//! filesystem. It is seeded once from a directory scan and afterwards only
//! changes through [`add_name`](DirectoryIndex::add_name) and
//! [`remove_name`](DirectoryIndex::remove_name), which the change notifier
//! calls. It never re-validates against disk, so it is eventually consistent
//! at best.

use std::path::Path;
use std::sync::RwLock;

use blobdir_fs::{DirEntryInfo, FileSystem};
use regex::Regex;
use tracing::{debug, info};

use crate::error::{IndexError, IndexResult};

/// A regular expression that must match a whole name.
#[derive(Clone, Debug)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    /// Compile `pattern` anchored at both ends.
    pub fn new(pattern: &str) -> IndexResult<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
            IndexError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns `true` if the whole of `name` matches.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as given by the caller.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Default)]
struct IndexState {
    /// Names in scan/event order; not sorted.
    names: Vec<String>,
    /// Moves in lock-step with `names`, one step per event.
    count: u64,
}

/// Cached file names and file count for one directory.
///
/// Readers and the single writer (the change notifier) share the state
/// through a `RwLock`, so a reader never sees the name list and the count
/// half-updated.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    state: RwLock<IndexState>,
}

impl DirectoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an index from names in enumeration order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let count = names.len() as u64;
        Self {
            state: RwLock::new(IndexState { names, count }),
        }
    }

    /// Build the index from a full enumeration of `dir`.
    pub fn scan(fs: &dyn FileSystem, dir: &Path) -> IndexResult<Self> {
        info!(dir = %dir.display(), "initializing file name index");
        Ok(Self::from_listing(dir, &fs.list_dir(dir)?))
    }

    /// Build the index from a listing of `dir` taken by the caller.
    pub fn from_listing(dir: &Path, entries: &[DirEntryInfo]) -> Self {
        let index = Self::from_names(entries.iter().map(|e| e.name.clone()));
        info!(count = index.count(), dir = %dir.display(), "file name index ready");
        index
    }

    /// Record a newly observed file.
    pub fn add_name(&self, name: &str) {
        let mut state = self.state.write().expect("index lock poisoned");
        state.names.push(name.to_string());
        state.count += 1;
        debug!(name, count = state.count, "cached file name");
    }

    /// Forget a removed file. Returns `true` if the name was cached.
    pub fn remove_name(&self, name: &str) -> bool {
        let mut state = self.state.write().expect("index lock poisoned");
        let found = match state.names.iter().position(|n| n == name) {
            Some(pos) => {
                state.names.remove(pos);
                true
            }
            None => false,
        };
        state.count = state.count.saturating_sub(1);
        debug!(name, found, count = state.count, "removed file name from cache");
        found
    }

    /// Number of entries in the directory, as last observed.
    pub fn count(&self) -> u64 {
        self.state.read().expect("index lock poisoned").count
    }

    /// Returns `true` if `name` is cached.
    pub fn contains(&self, name: &str) -> bool {
        self.state
            .read()
            .expect("index lock poisoned")
            .names
            .iter()
            .any(|n| n == name)
    }

    /// All cached names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.state.read().expect("index lock poisoned").names.clone()
    }

    /// Cached names fully matching `pattern`, in insertion order.
    ///
    /// An empty result is a valid outcome, not an error.
    pub fn list_names_matching(&self, pattern: &NamePattern) -> Vec<String> {
        self.state
            .read()
            .expect("index lock poisoned")
            .names
            .iter()
            .filter(|n| pattern.matches(n))
            .cloned()
            .collect()
    }
}
