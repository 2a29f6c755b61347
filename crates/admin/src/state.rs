//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::store::RemoteStore;
use crate::sync::SyncEngine;

/// Engine type the handlers drive.
pub type Engine = SyncEngine<dyn RemoteStore>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    engine: Engine,
}

impl AppState {
    /// Build state around a remote store.
    pub fn new(config: AdminConfig, store: Arc<dyn RemoteStore>) -> Self {
        let engine = SyncEngine::new(store, config.sync.clone(), &config.app);
        Self::with_engine(config, engine)
    }

    /// Build state around an already configured engine.
    pub fn with_engine(config: AdminConfig, engine: Engine) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, engine }),
        }
    }

    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }
}
