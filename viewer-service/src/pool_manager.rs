//! Data source connection pool registry.
//!
//! Holds one MySQL pool per named data source. The `default` pool is built from
//! the environment and can never be replaced or removed; every other pool
//! mirrors an entry of `datasources.json`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{Connection, MySqlPool};
use tokio::sync::{Mutex, RwLock};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{is_reserved_name, ConnectionParams, DataSource, DataSourceItem};
use common::utils::SqlLogFormat;

use crate::config_store::ConfigStore;
use crate::executor::MySqlExecutor;

/// Manages database connection pools.
pub struct PoolManager {
    config: AppConfig,
    store: Arc<ConfigStore>,
    /// Live pools indexed by data source name; always contains `default`.
    pools: RwLock<HashMap<String, MySqlPool>>,
    /// Serializes add / replace / remove so config read-modify-write cannot interleave.
    mutation_lock: Mutex<()>,
}

impl PoolManager {
    /// Creates the registry with the default pool plus one pool per stored source.
    ///
    /// Pools connect lazily, so an unreachable server does not block startup.
    pub async fn new(config: AppConfig, store: Arc<ConfigStore>) -> AppResult<Self> {
        let mut pools = HashMap::new();
        let default_source = config.default_source.clone();
        pools.insert(
            default_source.name.clone(),
            build_lazy_pool(&config, &default_source),
        );

        let stored = store.load_data_sources().await?;
        for source in &stored {
            pools.insert(source.name.clone(), build_lazy_pool(&config, source));
            tracing::info!(name = %source.name, host = %source.host, "data source registered");
        }
        tracing::info!(
            count = pools.len(),
            config_dir = %store.dir().display(),
            "database pools initialized"
        );

        Ok(Self {
            config,
            store,
            pools: RwLock::new(pools),
            mutation_lock: Mutex::new(()),
        })
    }

    /// Layout used for SQL logging.
    pub fn log_format(&self) -> SqlLogFormat {
        self.config.sql_log_format
    }

    /// Gets the pool of a data source.
    pub async fn get(&self, name: &str) -> AppResult<MySqlPool> {
        self.pools
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::DataSourceNotFound(name.to_string()))
    }

    /// Gets a logging executor bound to a data source's pool.
    pub async fn executor(&self, name: &str) -> AppResult<MySqlExecutor> {
        let pool = self.get(name).await?;
        Ok(MySqlExecutor::new(pool, self.log_format()))
    }

    /// Names of all registered pools.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn pool_count(&self) -> usize {
        self.pools.read().await.len()
    }

    /// Lists the default source followed by the stored ones.
    pub async fn list(&self) -> AppResult<Vec<DataSourceItem>> {
        let stored = self.store.load_data_sources().await?;
        let mut items = Vec::with_capacity(stored.len() + 1);
        items.push(DataSourceItem::from(&self.config.default_source));
        items.extend(stored.into_iter().map(DataSourceItem::from));
        Ok(items)
    }

    /// Adds a new data source after a successful connection test.
    pub async fn add(&self, source: DataSource) -> AppResult<DataSource> {
        if source.is_reserved() {
            return Err(AppError::DataSourceExists(source.name));
        }

        let _guard = self.mutation_lock.lock().await;
        let mut stored = self.store.load_data_sources().await?;
        let taken = stored.iter().any(|s| s.name == source.name)
            || self.pools.read().await.contains_key(&source.name);
        if taken {
            return Err(AppError::DataSourceExists(source.name));
        }

        self.test(&source).await?;

        stored.push(source.clone());
        self.store.save_data_sources(&stored).await?;

        let pool = build_lazy_pool(&self.config, &source);
        self.pools.write().await.insert(source.name.clone(), pool);

        tracing::info!(name = %source.name, host = %source.host, "data source added");
        Ok(source)
    }

    /// Replaces the connection settings of a stored data source.
    ///
    /// The superseded pool is closed once the new one is in place.
    pub async fn replace(&self, name: &str, params: ConnectionParams) -> AppResult<DataSource> {
        if is_reserved_name(name) {
            return Err(AppError::Validation(
                "Cannot modify default data source".to_string(),
            ));
        }

        let _guard = self.mutation_lock.lock().await;
        let mut stored = self.store.load_data_sources().await?;
        let index = stored
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| AppError::DataSourceNotFound(name.to_string()))?;

        let updated = params.apply_to(&stored[index]);
        self.test(&updated).await?;

        stored[index] = updated.clone();
        self.store.save_data_sources(&stored).await?;

        let pool = build_lazy_pool(&self.config, &updated);
        let previous = self.pools.write().await.insert(name.to_string(), pool);
        if let Some(previous) = previous {
            previous.close().await;
        }

        tracing::info!(name = %name, host = %updated.host, "data source updated");
        Ok(updated)
    }

    /// Removes a stored data source and closes its pool.
    pub async fn remove(&self, name: &str) -> AppResult<()> {
        if is_reserved_name(name) {
            return Err(AppError::Validation(
                "Cannot delete default data source".to_string(),
            ));
        }

        let _guard = self.mutation_lock.lock().await;
        let stored = self.store.load_data_sources().await?;
        let remaining: Vec<DataSource> = stored.iter().filter(|s| s.name != name).cloned().collect();
        if remaining.len() == stored.len() {
            return Err(AppError::DataSourceNotFound(name.to_string()));
        }
        self.store.save_data_sources(&remaining).await?;

        let removed = self.pools.write().await.remove(name);
        if let Some(pool) = removed {
            pool.close().await;
        }

        tracing::info!(name = %name, "data source deleted");
        Ok(())
    }

    /// Tests connection settings with a throwaway single-connection pool.
    ///
    /// # Errors
    /// Returns `AppError::ConnectionTest` carrying the driver message.
    pub async fn test(&self, source: &DataSource) -> AppResult<()> {
        tracing::info!(host = %source.host, port = source.port, "testing database connection");

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout())
            .connect_with(connect_options(source))
            .await
            .map_err(|e| AppError::ConnectionTest(driver_message(e)))?;

        let outcome = match pool.acquire().await {
            Ok(mut conn) => conn.ping().await,
            Err(e) => Err(e),
        };
        pool.close().await;

        outcome.map_err(|e| AppError::ConnectionTest(driver_message(e)))?;
        tracing::info!(host = %source.host, "connection test successful");
        Ok(())
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.config.connect_timeout_secs)
    }
}

fn build_lazy_pool(config: &AppConfig, source: &DataSource) -> MySqlPool {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_lazy_with(connect_options(source))
}

fn connect_options(source: &DataSource) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&source.host)
        .port(source.port)
        .username(&source.user)
        .password(&source.password)
        .database(&source.database)
}

fn driver_message(err: sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}
