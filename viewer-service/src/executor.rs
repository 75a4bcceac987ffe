//! Query execution.
//!
//! Every statement reaching MySQL goes through [`MySqlExecutor`], which
//! normalizes the text, logs it in the configured layout, binds parameters
//! and decodes rows into JSON maps.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, MySqlPool, Row as _, TypeInfo, ValueRef};

use common::errors::{AppError, AppResult};
use common::models::Row;
use common::utils::{normalize_sql, render_sql_log, SqlLogFormat};

/// Runs SQL against one data source.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executes `sql` with positional `params` and returns the result rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> AppResult<Vec<Row>>;
}

/// Executor bound to a MySQL pool.
#[derive(Clone)]
pub struct MySqlExecutor {
    pool: MySqlPool,
    log_format: SqlLogFormat,
}

impl MySqlExecutor {
    pub fn new(pool: MySqlPool, log_format: SqlLogFormat) -> Self {
        Self { pool, log_format }
    }
}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    async fn execute(&self, sql: &str, params: &[Value]) -> AppResult<Vec<Row>> {
        let sql = normalize_sql(sql);
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        tracing::info!(
            target: "sql",
            "{}",
            render_sql_log(self.log_format, &timestamp, &sql, params)
        );

        let query = params
            .iter()
            .fold(sqlx::query(&sql), |query, param| bind_param(query, param));

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!(target: "sql", timestamp = %timestamp, error = %e, "SQL error");
            AppError::from(e)
        })?;

        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn bind_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decodes a driver row into a column → JSON map, keeping column order.
fn row_to_json(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| {
            let value = decode_column(row, column.ordinal(), column.type_info().name());
            (column.name().to_string(), value)
        })
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    decode_typed(row, idx, type_name).unwrap_or_else(|e| {
        tracing::debug!(column = idx, type_name, error = %e, "falling back to text decode");
        row.try_get_unchecked::<String, _>(idx)
            .map(Value::String)
            .or_else(|_| {
                row.try_get_unchecked::<Vec<u8>, _>(idx)
                    .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            })
            .unwrap_or(Value::Null)
    })
}

fn decode_typed(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(idx)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" | "BIT" => Value::from(row.try_get::<u64, _>(idx)?),
        "YEAR" => Value::from(row.try_get_unchecked::<u16, _>(idx)?),
        "FLOAT" => Value::from(f64::from(row.try_get::<f32, _>(idx)?)),
        "DOUBLE" => Value::from(row.try_get::<f64, _>(idx)?),
        // Exact decimals stay strings to avoid float rounding.
        "DECIMAL" => Value::String(row.try_get_unchecked::<String, _>(idx)?),
        "DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(idx)?.to_string()),
        "DATETIME" => Value::String(
            row.try_get::<chrono::NaiveDateTime, _>(idx)?
                .format("%Y-%m-%d %H:%M:%S%.f")
                .to_string(),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get::<chrono::DateTime<Utc>, _>(idx)?
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        "JSON" => row.try_get::<Value, _>(idx)?,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            let bytes = row.try_get::<Vec<u8>, _>(idx)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::String(row.try_get::<String, _>(idx)?),
    };
    Ok(value)
}
