//! The data-access context
//!
//! [`DataLayer`] builds and wires the storage tiers, the cache, the session
//! manager and the request coordinator. One context exists per process; it
//! is passed explicitly to whatever needs it.

use crate::cache::TieredCache;
use crate::client::{HttpTransport, ReqwestTransport, RequestCoordinator};
use crate::clock::{SharedClock, SystemClock};
use crate::config::ClientConfig;
use crate::error::BeaconResult;
use crate::lifecycle::PageLifecycle;
use crate::session::{SessionManager, SessionState};
use crate::storage::{
    BoundedStore, DiskStore, MemoryStore, SharedAsyncStore, SharedSyncStore,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const LOCAL_STORE_FILE: &str = "local.json";
const OVERFLOW_DIR: &str = "overflow";

/// Builder for [`DataLayer`]
pub struct DataLayerBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    clock: Option<SharedClock>,
    local_store: Option<SharedSyncStore>,
    overflow_store: Option<SharedAsyncStore>,
    lifecycle: Option<PageLifecycle>,
}

impl DataLayerBuilder {
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn local_store(mut self, store: SharedSyncStore) -> Self {
        self.local_store = Some(store);
        self
    }

    pub fn overflow_store(mut self, store: SharedAsyncStore) -> Self {
        self.overflow_store = Some(store);
        self
    }

    pub fn lifecycle(mut self, lifecycle: PageLifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Open storage, restore any persisted session and wire everything up
    pub async fn build(self) -> BeaconResult<DataLayer> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&config.timeouts)?),
        };
        let clock: SharedClock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let lifecycle = self.lifecycle.unwrap_or_default();

        let local_store = match self.local_store {
            Some(store) => store,
            None => open_local_store(&config),
        };
        let overflow_store = match self.overflow_store {
            Some(store) => store,
            None => open_overflow_store(&config).await,
        };

        let cache = Arc::new(TieredCache::new(
            &config.cache,
            Arc::clone(&local_store),
            overflow_store,
            Arc::clone(&clock),
        ));
        let session = SessionManager::new(
            &config,
            Arc::clone(&transport),
            Arc::clone(&cache),
            local_store,
            clock,
        );
        let client = RequestCoordinator::new(
            config.base_url(),
            transport,
            Arc::clone(&cache),
            Arc::new(session.clone()),
            lifecycle.clone(),
        );

        let state = session.restore().await?;
        if let SessionState::Authenticated { user, .. } = &state {
            info!("Data layer ready, signed in as {}", user.display_name());
        } else {
            info!("Data layer ready");
        }

        Ok(DataLayer {
            config,
            cache,
            session,
            client,
            lifecycle,
        })
    }
}

fn open_local_store(config: &ClientConfig) -> SharedSyncStore {
    let quota = config.storage.local_quota_bytes;
    let Some(dir) = &config.storage.dir else {
        return Arc::new(BoundedStore::in_memory(quota));
    };
    match BoundedStore::open(dir.join(LOCAL_STORE_FILE), quota) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "Local store unavailable in {}, keeping it in memory: {}",
                dir.display(),
                e
            );
            Arc::new(BoundedStore::in_memory(quota))
        }
    }
}

async fn open_overflow_store(config: &ClientConfig) -> SharedAsyncStore {
    let Some(dir) = &config.storage.dir else {
        return Arc::new(MemoryStore::new());
    };
    match open_disk_store(&dir.join(OVERFLOW_DIR)).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "Overflow store unavailable in {}, keeping it in memory: {}",
                dir.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

async fn open_disk_store(dir: &Path) -> Result<DiskStore, crate::storage::StorageError> {
    let store = DiskStore::new(dir)?;
    store.initialize().await?;
    Ok(store)
}

/// One data-access context
#[derive(Debug)]
pub struct DataLayer {
    config: ClientConfig,
    cache: Arc<TieredCache>,
    session: SessionManager,
    client: RequestCoordinator,
    lifecycle: PageLifecycle,
}

impl DataLayer {
    pub fn builder(config: ClientConfig) -> DataLayerBuilder {
        DataLayerBuilder {
            config,
            transport: None,
            clock: None,
            local_store: None,
            overflow_store: None,
            lifecycle: None,
        }
    }

    pub fn client(&self) -> &RequestCoordinator {
        &self.client
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    pub fn lifecycle(&self) -> &PageLifecycle {
        &self.lifecycle
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Begin teardown and stop the renewal timer
    pub fn shutdown(&self) {
        self.lifecycle.begin_teardown();
        self.session.shutdown();
    }
}
