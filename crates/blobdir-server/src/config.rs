use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use blobdir_fs::FileSystem;
use blobdir_index::WatcherConfig;
use blobdir_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the stored files.
    pub store_dir: PathBuf,
    /// Directory receiving backups during mutations.
    pub backup_dir: PathBuf,
    pub poll_interval_ms: u64,
    /// How long the store directory must stay unchanged before a batch of
    /// changes is reported.
    pub quiet_period_ms: u64,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            store_dir: PathBuf::from("files"),
            backup_dir: PathBuf::from("backup"),
            poll_interval_ms: 1000,
            quiet_period_ms: 400,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check everything that would otherwise fail after startup.
    pub fn validate(&self, fs: &dyn FileSystem) -> ServerResult<()> {
        check_dir(fs, "store_dir", &self.store_dir)?;
        check_dir(fs, "backup_dir", &self.backup_dir)?;
        let store = canonical(fs, "store_dir", &self.store_dir)?;
        let backup = canonical(fs, "backup_dir", &self.backup_dir)?;
        if store.starts_with(&backup) || backup.starts_with(&store) {
            return Err(ServerError::Config(format!(
                "store_dir {} and backup_dir {} must not overlap",
                store.display(),
                backup.display()
            )));
        }
        if self.poll_interval_ms == 0 || self.quiet_period_ms == 0 {
            return Err(ServerError::Config(
                "poll_interval_ms and quiet_period_ms must be greater than zero".into(),
            ));
        }
        if self.quiet_period_ms >= self.poll_interval_ms {
            return Err(ServerError::Config(format!(
                "quiet_period_ms ({}) must be shorter than poll_interval_ms ({})",
                self.quiet_period_ms, self.poll_interval_ms
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(ServerError::Config("max_upload_bytes must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.store_dir, &self.backup_dir)
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            dir: self.store_dir.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            quiet_period: Duration::from_millis(self.quiet_period_ms),
        }
    }
}

fn check_dir(fs: &dyn FileSystem, key: &str, dir: &Path) -> ServerResult<()> {
    if !fs.exists(dir) {
        return Err(ServerError::Config(format!("{key} {} does not exist", dir.display())));
    }
    if !fs.is_dir(dir) {
        return Err(ServerError::Config(format!("{key} {} is not a directory", dir.display())));
    }
    Ok(())
}

fn canonical(fs: &dyn FileSystem, key: &str, dir: &Path) -> ServerResult<PathBuf> {
    fs.canonicalize(dir)
        .map_err(|e| ServerError::Config(format!("cannot resolve {key}: {e}")))
}
