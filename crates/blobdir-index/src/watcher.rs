//! Polling change notifier.
//!
//! Every `poll_interval` the watcher snapshots the directory. When the
//! snapshot differs from the last reported one it keeps re-snapshotting every
//! `quiet_period` until two consecutive snapshots agree, then diffs the old
//! baseline against the settled snapshot and hands the batch to every
//! listener. A burst of writes therefore arrives as one batch once the
//! directory has gone quiet.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use blobdir_fs::{DirEntryInfo, FileSystem, FsResult};
use blobdir_types::Version;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::event::{ChangeEvent, ChangeListener};

/// What the watcher remembers about one entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryStamp {
    pub len: u64,
    pub modified: Version,
}

/// Point-in-time state of a directory, keyed by entry name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, EntryStamp>,
}

impl Snapshot {
    /// Build a snapshot from an existing listing.
    pub fn from_entries(entries: &[DirEntryInfo]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|e| {
                    (
                        e.name.clone(),
                        EntryStamp {
                            len: e.len,
                            modified: e.modified,
                        },
                    )
                })
                .collect(),
        }
    }

    /// List `dir` and snapshot it.
    pub fn capture(fs: &dyn FileSystem, dir: &Path) -> FsResult<Self> {
        Ok(Self::from_entries(&fs.list_dir(dir)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Changes that turn `self` into `newer`: removals first, then
    /// additions and modifications, each in name order.
    pub fn diff(&self, newer: &Snapshot) -> Vec<ChangeEvent> {
        let mut events: Vec<ChangeEvent> = self
            .entries
            .keys()
            .filter(|name| !newer.entries.contains_key(*name))
            .map(ChangeEvent::removed)
            .collect();

        for (name, stamp) in &newer.entries {
            match self.entries.get(name) {
                None => events.push(ChangeEvent::added(name)),
                Some(old) if old != stamp => events.push(ChangeEvent::modified(name)),
                Some(_) => {}
            }
        }
        events
    }
}

/// Timing and location for a [`PollingWatcher`].
#[derive(Clone, Debug)]
pub struct WatcherConfig {
    pub dir: PathBuf,
    pub poll_interval: Duration,
    pub quiet_period: Duration,
}

/// Background poller that reports directory changes to listeners.
pub struct PollingWatcher {
    fs: Arc<dyn FileSystem>,
    config: WatcherConfig,
    listeners: Vec<Arc<dyn ChangeListener>>,
}

impl PollingWatcher {
    pub fn new(fs: Arc<dyn FileSystem>, config: WatcherConfig) -> Self {
        Self {
            fs,
            config,
            listeners: Vec::new(),
        }
    }

    /// Register a listener. Listeners are called in registration order.
    pub fn add_listener(&mut self, listener: Arc<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Start polling on the current tokio runtime.
    ///
    /// `baseline` is the state the listeners already know about, usually the
    /// same listing the index was seeded from.
    pub fn spawn(self, baseline: Snapshot) -> WatcherHandle {
        let (shutdown, rx) = watch::channel(false);
        info!(
            dir = %self.config.dir.display(),
            interval_ms = self.config.poll_interval.as_millis() as u64,
            quiet_ms = self.config.quiet_period.as_millis() as u64,
            "started watching folder"
        );
        let task = tokio::spawn(self.run(baseline, rx));
        WatcherHandle { shutdown, task }
    }

    async fn run(self, mut baseline: Snapshot, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let Some(current) = self.capture().await else {
                continue;
            };
            if current == baseline {
                continue;
            }

            let Some(settled) = self.settle(current, &mut shutdown).await else {
                if Self::stopping(&shutdown) {
                    break;
                }
                continue;
            };

            let events = baseline.diff(&settled);
            baseline = settled;
            if !events.is_empty() {
                debug!(count = events.len(), "directory changed");
                self.dispatch(&events);
            }
        }
        info!(dir = %self.config.dir.display(), "stopped watching folder");
    }

    /// Re-snapshot every quiet period until the directory stops changing.
    ///
    /// Returns `None` on shutdown or when a snapshot fails.
    async fn settle(
        &self,
        mut last: Snapshot,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<Snapshot> {
        loop {
            tokio::select! {
                _ = time::sleep(self.config.quiet_period) => {}
                _ = shutdown.changed() => return None,
            }
            let next = self.capture().await?;
            if next == last {
                return Some(last);
            }
            last = next;
        }
    }

    async fn capture(&self) -> Option<Snapshot> {
        let fs = Arc::clone(&self.fs);
        let dir = self.config.dir.clone();
        match tokio::task::spawn_blocking(move || Snapshot::capture(fs.as_ref(), &dir)).await {
            Ok(Ok(snapshot)) => Some(snapshot),
            Ok(Err(e)) => {
                warn!(dir = %self.config.dir.display(), error = %e, "directory poll failed");
                None
            }
            Err(e) => {
                error!(error = %e, "directory poll task failed");
                None
            }
        }
    }

    fn dispatch(&self, events: &[ChangeEvent]) {
        for listener in &self.listeners {
            listener.on_change(events);
        }
    }

    fn stopping(shutdown: &watch::Receiver<bool>) -> bool {
        *shutdown.borrow() || shutdown.has_changed().is_err()
    }
}

/// Handle to a running [`PollingWatcher`].
///
/// Dropping the handle also stops the watcher at its next wake-up.
pub struct WatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Signal the watcher to stop and wait for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "watcher task failed");
        }
    }

    /// Returns `true` once the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
