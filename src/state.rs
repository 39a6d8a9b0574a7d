//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::storage::UploadBackend;
use crate::upload::{ChunkRelay, SessionInitiator, SessionStore, SingleShotRelay};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: Arc<dyn SessionStore>,
    initiator: SessionInitiator,
    chunk_relay: ChunkRelay,
    single_shot: SingleShotRelay,
}

impl AppState {
    /// Wire the upload components around one store, token source and backend
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialProvider>,
        backend: Arc<dyn UploadBackend>,
    ) -> Self {
        let initiator = SessionInitiator::new(
            store.clone(),
            credentials.clone(),
            backend.clone(),
            config.upload.clone(),
            config.drive.parent_folder_id.clone(),
        );
        let chunk_relay = ChunkRelay::new(store.clone(), credentials.clone(), backend.clone());
        let single_shot = SingleShotRelay::new(store.clone(), credentials, backend);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                initiator,
                chunk_relay,
                single_shot,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the session store
    pub fn store(&self) -> &dyn SessionStore {
        self.inner.store.as_ref()
    }

    pub fn initiator(&self) -> &SessionInitiator {
        &self.inner.initiator
    }

    pub fn chunk_relay(&self) -> &ChunkRelay {
        &self.inner.chunk_relay
    }

    pub fn single_shot(&self) -> &SingleShotRelay {
        &self.inner.single_shot
    }
}
