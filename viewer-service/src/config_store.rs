//! JSON config file persistence.
//!
//! Two documents live in the config directory: `datasources.json` (stored data
//! sources, never the default one) and `relationships.json` (table →
//! relationship list). A missing file reads as an empty collection.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use common::errors::{AppError, AppResult};
use common::models::{DataSource, RelationshipMap};

const DATASOURCES_FILE: &str = "datasources.json";
const RELATIONSHIPS_FILE: &str = "relationships.json";

/// Reads and writes the config documents.
pub struct ConfigStore {
    dir: PathBuf,
    /// Serializes writers; each write goes to a temp file renamed into place.
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stored data sources, in insertion order.
    pub async fn load_data_sources(&self) -> AppResult<Vec<DataSource>> {
        let sources: Vec<DataSource> = self.read_json(DATASOURCES_FILE).await?;
        Ok(sources.into_iter().filter(|s| !s.is_reserved()).collect())
    }

    pub async fn save_data_sources(&self, sources: &[DataSource]) -> AppResult<()> {
        self.write_json(DATASOURCES_FILE, sources).await
    }

    pub async fn load_relationships(&self) -> AppResult<RelationshipMap> {
        self.read_json(RELATIONSHIPS_FILE).await
    }

    pub async fn save_relationships(&self, relationships: &RelationshipMap) -> AppResult<()> {
        self.write_json(RELATIONSHIPS_FILE, relationships).await
    }

    async fn read_json<T>(&self, file: &str) -> AppResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.dir.join(file);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Ok(T::default()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                AppError::Config(format!("failed to parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(AppError::Config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_json<T>(&self, file: &str, value: &T) -> AppResult<()>
    where
        T: Serialize + ?Sized,
    {
        let content = serde_json::to_string_pretty(value)?;
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!(".{}.tmp", file));

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }
}
