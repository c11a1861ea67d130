//! Directory index for blobdir.
//!
//! A [`DirectoryIndex`] caches the names and the number of files in the
//! store directory so that listing and counting never hit the disk. A
//! [`PollingWatcher`] observes the directory and feeds batches of
//! [`ChangeEvent`]s to its listeners; [`IndexUpdater`] is the listener that
//! applies them to the index.
//!
//! The index is eventually consistent: between a change on disk and the next
//! settled poll, queries return the previous state.

pub mod error;
pub mod event;
pub mod index;
pub mod watcher;

pub use error::{IndexError, IndexResult};
pub use event::{ChangeEvent, ChangeKind, ChangeListener, IndexUpdater};
pub use index::{DirectoryIndex, NamePattern};
pub use watcher::{EntryStamp, PollingWatcher, Snapshot, WatcherConfig, WatcherHandle};
