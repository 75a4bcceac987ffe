//! Data source models.
//!
//! A data source is a named MySQL connection configuration. The `default`
//! source is synthesized from the environment and never persisted.

use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Reserved name of the environment-provided data source.
pub const DEFAULT_SOURCE_NAME: &str = "default";

/// Default MySQL port.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

/// Accepts a port as a JSON number or a numeric string; `null` and `""` mean 3306.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Number(u16),
        Text(String),
    }

    match Option::<PortRepr>::deserialize(deserializer)? {
        None => Ok(DEFAULT_MYSQL_PORT),
        Some(PortRepr::Number(port)) => Ok(port),
        Some(PortRepr::Text(text)) if text.trim().is_empty() => Ok(DEFAULT_MYSQL_PORT),
        Some(PortRepr::Text(text)) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid port: {}", text))),
    }
}

/// Full data source configuration (as stored in `datasources.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Unique, immutable name.
    pub name: String,
    /// MySQL host.
    pub host: String,
    /// MySQL port.
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    /// MySQL user.
    pub user: String,
    /// MySQL password.
    #[serde(default)]
    pub password: String,
    /// Database (schema) name.
    pub database: String,
    /// Set only on the synthesized `default` source.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
}

impl DataSource {
    /// Builds the `default` data source from its connection parts.
    pub fn default_from_parts(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Self {
        Self {
            name: DEFAULT_SOURCE_NAME.to_string(),
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            is_default: true,
        }
    }

    /// Whether this source carries the reserved `default` name.
    pub fn is_reserved(&self) -> bool {
        is_reserved_name(&self.name)
    }
}

/// Whether `name` is the reserved default source name.
pub fn is_reserved_name(name: &str) -> bool {
    name == DEFAULT_SOURCE_NAME
}

/// Request body for creating a data source.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDataSourceRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "host is required"))]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    #[serde(default)]
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "database is required"))]
    pub database: String,
}

impl CreateDataSourceRequest {
    /// Converts the request into a storable data source.
    pub fn into_source(self) -> DataSource {
        DataSource {
            name: self.name,
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
            database: self.database,
            is_default: false,
        }
    }
}

/// Request body for updating a data source, and for probing connection settings.
///
/// The name comes from the URL path and cannot change.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConnectionParams {
    #[serde(default)]
    #[validate(length(min = 1, message = "host is required"))]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    #[serde(default)]
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
    /// Omitted on update to keep the stored password.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "database is required"))]
    pub database: String,
}

impl ConnectionParams {
    /// Applies these settings to an existing source, keeping its name.
    pub fn apply_to(self, existing: &DataSource) -> DataSource {
        DataSource {
            name: existing.name.clone(),
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password.unwrap_or_else(|| existing.password.clone()),
            database: self.database,
            is_default: false,
        }
    }

    /// Builds an unnamed source for a throwaway connection test.
    pub fn into_unsaved(self) -> DataSource {
        DataSource {
            name: String::new(),
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password.unwrap_or_default(),
            database: self.database,
            is_default: false,
        }
    }
}

/// Data source view for API responses (password omitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceItem {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub is_default: bool,
}

impl From<&DataSource> for DataSourceItem {
    fn from(source: &DataSource) -> Self {
        Self {
            name: source.name.clone(),
            host: source.host.clone(),
            port: source.port,
            user: source.user.clone(),
            database: source.database.clone(),
            is_default: source.is_default,
        }
    }
}

impl From<DataSource> for DataSourceItem {
    fn from(source: DataSource) -> Self {
        Self {
            name: source.name,
            host: source.host,
            port: source.port,
            user: source.user,
            database: source.database,
            is_default: source.is_default,
        }
    }
}
