use std::future::Future;
use std::sync::Arc;

use blobdir_fs::{FileSystem, LocalFileSystem};
use blobdir_index::{DirectoryIndex, IndexError, IndexUpdater, PollingWatcher, Snapshot, WatcherHandle};
use blobdir_store::FileStore;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// blobdir file server.
pub struct BlobdirServer {
    config: ServerConfig,
    fs: Arc<dyn FileSystem>,
}

impl BlobdirServer {
    /// A server over the local disk.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_file_system(config, Arc::new(LocalFileSystem::new()))
    }

    pub fn with_file_system(config: ServerConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self { config, fs }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Validate the configuration, seed the index, and start the watcher.
    ///
    /// The index and the watcher baseline come from the same listing, so no
    /// change can slip in between them. Must be called inside a tokio runtime.
    pub fn prepare(&self) -> ServerResult<(AppState, WatcherHandle)> {
        self.config.validate(self.fs.as_ref())?;

        let entries = self
            .fs
            .list_dir(&self.config.store_dir)
            .map_err(IndexError::from)?;
        let index = Arc::new(DirectoryIndex::from_listing(&self.config.store_dir, &entries));

        let mut watcher = PollingWatcher::new(Arc::clone(&self.fs), self.config.watcher_config());
        watcher.add_listener(Arc::new(IndexUpdater::new(Arc::clone(&index))));
        let handle = watcher.spawn(Snapshot::from_entries(&entries));

        let store = Arc::new(FileStore::new(Arc::clone(&self.fs), self.config.store_config()));
        let state = AppState::new(store, index).with_upload_limit(self.config.max_upload_bytes);
        Ok((state, handle))
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (state, watcher) = self.prepare()?;
        let app = build_router(state);
        info!("blobdir server listening on {}", listener.local_addr()?);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));
        watcher.stop().await;
        served
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn start(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_with_listener(listener, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
        })
        .await
    }
}
