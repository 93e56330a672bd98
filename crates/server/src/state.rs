use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use catalog::Catalog;
use embed::Embedder;
use index::{StoreDir, StoreHandle};
use metrics_exporter_prometheus::PrometheusHandle;
use prodmatch::ProductMatcher;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Catalog, hot-swappable store, and embedder
    pub matcher: Arc<ProductMatcher>,

    /// Prometheus renderer, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Assemble state from already constructed collaborators.
    ///
    /// Fails when a non-empty store was built with a different dimensionality
    /// than `embedder` produces.
    pub fn new(
        config: ServerConfig,
        catalog: Catalog,
        store: StoreHandle,
        embedder: Arc<dyn Embedder>,
    ) -> ServerResult<Self> {
        let matcher = ProductMatcher::new(catalog, store, embedder)?;
        Ok(Self {
            config: Arc::new(config),
            matcher: Arc::new(matcher),
            metrics: None,
        })
    }

    /// Load catalog, store, and embedder as described by `config`.
    ///
    /// A missing or corrupt store is fatal: the service refuses to start rather
    /// than answer from misaligned data.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let catalog = Catalog::load(&config.catalog_path)?;
        let store = StoreHandle::open(StoreDir::new(&config.store_dir))
            .map_err(ServerError::StoreUnavailable)?;
        let embedder = embed::build_embedder(&config.embedder)
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Self::new(config, catalog, store, embedder)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
