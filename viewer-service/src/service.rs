//! Table browsing and relationship resolution.

use std::collections::HashSet;

use serde_json::{Map, Value};

use common::errors::{AppError, AppResult};
use common::models::{PageRequest, Row};
use common::response::TablePage;
use common::utils::SqlValidator;

use crate::config_store::ConfigStore;
use crate::executor::SqlExecutor;

/// Read-only table operations against one data source.
pub struct TableService<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> TableService<'a> {
    pub fn new(executor: &'a dyn SqlExecutor) -> Self {
        Self { executor }
    }

    /// Table names of the data source's database.
    pub async fn list_tables(&self) -> AppResult<Vec<String>> {
        let rows = self.executor.execute("SHOW TABLES", &[]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().map(|(_, value)| value))
            .map(|value| match value {
                Value::String(name) => name,
                other => other.to_string(),
            })
            .collect())
    }

    /// Column descriptors as returned by `DESCRIBE`.
    ///
    /// # Errors
    /// Returns `AppError::TableNotFound` when the table does not exist.
    pub async fn describe(&self, table: &str) -> AppResult<Vec<Row>> {
        let sql = format!("DESCRIBE {}", SqlValidator::quote_identifier(table)?);
        self.executor.execute(&sql, &[]).await.map_err(|e| match e {
            AppError::TableNotFound(_) => AppError::TableNotFound(table.to_string()),
            other => other,
        })
    }

    /// One page of rows, filtered by `filters`, plus the unfiltered row count.
    ///
    /// String filter values match as `LIKE '%v%'`, `null` as `IS NULL` and
    /// other scalars by equality. Every filter column must exist in the table.
    pub async fn page(
        &self,
        table: &str,
        request: PageRequest,
        filters: &Map<String, Value>,
    ) -> AppResult<TablePage> {
        let columns: HashSet<String> = self
            .describe(table)
            .await?
            .into_iter()
            .filter_map(|row| match row.get("Field") {
                Some(Value::String(field)) => Some(field.clone()),
                _ => None,
            })
            .collect();

        let quoted_table = SqlValidator::quote_identifier(table)?;
        let (where_clause, params) = build_where(filters, &columns)?;

        let sql = format!(
            "SELECT * FROM {}{} LIMIT {} OFFSET {}",
            quoted_table,
            where_clause,
            request.limit,
            request.offset()
        );
        let data = self.executor.execute(&sql, &params).await?;

        let count_sql = format!("SELECT COUNT(*) as total FROM {}", quoted_table);
        let count_rows = self.executor.execute(&count_sql, &[]).await?;
        let total = count_rows
            .first()
            .and_then(|row| row.get("total"))
            .map(count_value)
            .unwrap_or_default();

        tracing::debug!(table = %table, rows = data.len(), total, "table page fetched");
        Ok(TablePage::new(data, total, request))
    }

    /// Runs an ad-hoc statement after checking it is a SELECT.
    pub async fn select(&self, query: Option<&str>) -> AppResult<Vec<Row>> {
        let sql = SqlValidator::require_select(query)?;
        self.executor.execute(sql, &[]).await
    }
}

fn build_where(
    filters: &Map<String, Value>,
    columns: &HashSet<String>,
) -> AppResult<(String, Vec<Value>)> {
    let mut clauses = Vec::with_capacity(filters.len());
    let mut params = Vec::new();

    for (column, value) in filters {
        if !columns.contains(column) {
            return Err(AppError::Validation(format!(
                "Unknown filter column: {}",
                column
            )));
        }
        let quoted = SqlValidator::quote_identifier(column)?;
        match value {
            Value::String(text) => {
                clauses.push(format!("{} LIKE ?", quoted));
                params.push(Value::String(format!("%{}%", text)));
            }
            Value::Null => clauses.push(format!("{} IS NULL", quoted)),
            Value::Bool(_) | Value::Number(_) => {
                clauses.push(format!("{} = ?", quoted));
                params.push(value.clone());
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(AppError::Validation(format!(
                    "Invalid filter value for column: {}",
                    column
                )));
            }
        }
    }

    if clauses.is_empty() {
        return Ok((String::new(), params));
    }
    Ok((format!(" WHERE {}", clauses.join(" AND ")), params))
}

fn count_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or_default(),
        Value::String(s) => s.parse().unwrap_or_default(),
        _ => 0,
    }
}

/// Fetches rows related to one record through the declared relationships.
pub struct RelationshipResolver<'a> {
    store: &'a ConfigStore,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    /// Foreign table → rows whose foreign key equals `id`.
    ///
    /// A failing lookup yields an empty list for that table only.
    pub async fn resolve(
        &self,
        executor: &dyn SqlExecutor,
        table: &str,
        id: &str,
    ) -> AppResult<Map<String, Value>> {
        let relationships = self.store.load_relationships().await?;
        let mut related = Map::new();

        for relationship in relationships.get(table).into_iter().flatten() {
            let rows = match lookup_sql(&relationship.foreign_table, &relationship.foreign_key) {
                Ok(sql) => executor
                    .execute(&sql, &[Value::String(id.to_string())])
                    .await,
                Err(e) => Err(e),
            };
            let rows = rows.unwrap_or_else(|e| {
                tracing::warn!(
                    table = %table,
                    foreign_table = %relationship.foreign_table,
                    error = %e,
                    "related rows lookup failed"
                );
                Vec::new()
            });
            related.insert(
                relationship.foreign_table.clone(),
                Value::Array(rows.into_iter().map(Value::Object).collect()),
            );
        }

        Ok(related)
    }
}

fn lookup_sql(foreign_table: &str, foreign_key: &str) -> AppResult<String> {
    Ok(format!(
        "SELECT * FROM {} WHERE {} = ?",
        SqlValidator::quote_identifier(foreign_table)?,
        SqlValidator::quote_identifier(foreign_key)?
    ))
}
