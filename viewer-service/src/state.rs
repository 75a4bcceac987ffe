//! Application state for the viewer service.

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppResult;

use crate::config_store::ConfigStore;
use crate::executor::MySqlExecutor;
use crate::pool_manager::PoolManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool_manager: Arc<PoolManager>,
    pub store: Arc<ConfigStore>,
}

impl AppState {
    /// Creates the state, registering the default and every stored data source.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let store = Arc::new(ConfigStore::new(config.config_dir.clone()));
        let pool_manager = Arc::new(PoolManager::new(config.clone(), store.clone()).await?);
        Ok(Self {
            config,
            pool_manager,
            store,
        })
    }

    /// Executor for the named data source.
    pub async fn executor(&self, data_source: &str) -> AppResult<MySqlExecutor> {
        self.pool_manager.executor(data_source).await
    }
}
