//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;

use crate::models::datasource::{DataSource, DEFAULT_MYSQL_PORT};
use crate::utils::sql_format::SqlLogFormat;

const DEFAULT_PORT: u16 = 3001;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Directory holding `datasources.json` and `relationships.json`.
    pub config_dir: PathBuf,
    /// Layout used when logging SQL statements.
    pub sql_log_format: SqlLogFormat,
    /// Maximum connections per pool.
    pub max_connections: u32,
    /// Pool acquire and connection test timeout.
    pub connect_timeout_secs: u64,
    /// Connection settings of the implicit `default` data source.
    pub default_source: DataSource,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            config_dir: PathBuf::from("config"),
            sql_log_format: SqlLogFormat::default(),
            max_connections: 10,
            connect_timeout_secs: 10,
            default_source: DataSource::default_from_parts(
                "localhost",
                DEFAULT_MYSQL_PORT,
                "root",
                "",
                "test",
            ),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str, fallback: &str| lookup(key).unwrap_or_else(|| fallback.to_string());

        let sql_log_format = match lookup("SQL_LOG_FORMAT") {
            Some(raw) => SqlLogFormat::from_str(&raw).unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unknown SQL_LOG_FORMAT, using formatted");
                SqlLogFormat::default()
            }),
            None => SqlLogFormat::default(),
        };

        let base = &defaults.default_source;
        let default_source = DataSource::default_from_parts(
            &get("DB_HOST", &base.host),
            parse_var(&lookup, "DB_PORT").unwrap_or(base.port),
            &get("DB_USER", &base.user),
            &get("DB_PASSWORD", &base.password),
            &get("DB_NAME", &base.database),
        );

        Self {
            host: get("HOST", &defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            config_dir: lookup("CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_dir),
            sql_log_format,
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")
                .unwrap_or(defaults.max_connections),
            connect_timeout_secs: parse_var(&lookup, "DB_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout_secs),
            default_source,
        }
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
