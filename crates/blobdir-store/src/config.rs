use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the store keeps primary files and in-flight backups.
///
/// The two directories must be disjoint; both must exist before the store is
/// used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub store_dir: PathBuf,
    pub backup_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(store_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }
}
