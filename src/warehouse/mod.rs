//! Warehouse access layer.
//!
//! Provides a trait-based interface for running SQL against the warehouse,
//! so the insight façade and HTTP layer can be exercised against mocks.

mod databricks;
mod mock;
mod types;

pub use databricks::DatabricksSqlClient;
pub use mock::{FailingWarehouseClient, MockWarehouseClient};
pub use types::{ColumnInfo, QueryResult, Record, Row, Value};

use crate::error::{InsightsError, Result};
use crate::queries::{table_count_sql, STAR_SCHEMA_TABLES};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Trait defining the interface for warehouse clients.
///
/// Implementations never panic on warehouse failures; every error is
/// returned as an [`InsightsError`](crate::error::InsightsError).
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Executes a SQL statement and returns its rows.
    ///
    /// A statement that yields zero rows returns an empty result, not an error.
    async fn execute(&self, sql: &str) -> Result<QueryResult>;
}

/// Existence and size of one star-schema table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStatus {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probes every star-schema table with a row count.
///
/// A failed probe marks that table as missing and carries the error; the
/// check as a whole only fails if credentials are not configured.
pub async fn check_tables(client: &dyn WarehouseClient) -> Result<BTreeMap<String, TableStatus>> {
    let mut tables = BTreeMap::new();

    for table in STAR_SCHEMA_TABLES {
        let Some(sql) = table_count_sql(table) else {
            continue;
        };

        let status = match client.execute(&sql).await {
            Ok(result) => TableStatus {
                exists: true,
                row_count: Some(
                    result
                        .rows
                        .first()
                        .and_then(|row| row.first())
                        .and_then(Value::as_i64)
                        .unwrap_or(0),
                ),
                error: None,
            },
            Err(InsightsError::NotConfigured) => return Err(InsightsError::NotConfigured),
            Err(e) => {
                warn!("Table check for {} failed: {}", table, e);
                TableStatus {
                    exists: false,
                    row_count: None,
                    error: Some(e.to_string()),
                }
            }
        };
        tables.insert(table.to_string(), status);
    }

    Ok(tables)
}
