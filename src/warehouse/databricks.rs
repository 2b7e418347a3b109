//! Databricks SQL warehouse client.
//!
//! Implements [`WarehouseClient`] over the SQL Statement Execution API
//! (`/api/2.0/sql/statements`). Results are requested inline as
//! `JSON_ARRAY`; follow-on chunks are fetched until the result is complete.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{ColumnInfo, QueryResult, Row, Value, WarehouseClient};
use crate::config::{Credentials, MIN_REQUEST_TIMEOUT_SECS};
use crate::error::{InsightsError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Bounds the API accepts for `wait_timeout`.
const MIN_WAIT_SECS: u64 = 5;
const MAX_WAIT_SECS: u64 = 50;

/// Statement Execution API client bound to one SQL warehouse.
#[derive(Debug, Clone)]
pub struct DatabricksSqlClient {
    credentials: Arc<Credentials>,
    client: Client,
    wait_secs: u64,
}

impl DatabricksSqlClient {
    /// Creates a client with the default 30 second request timeout.
    pub fn new(credentials: Arc<Credentials>) -> Result<Self> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client whose HTTP requests time out after `timeout_secs`.
    ///
    /// The server-side wait is kept a few seconds below the HTTP timeout so
    /// the warehouse cancels a slow statement before the request is dropped.
    /// Timeouts below [`MIN_REQUEST_TIMEOUT_SECS`] leave no room for that.
    pub fn with_timeout(credentials: Arc<Credentials>, timeout_secs: u64) -> Result<Self> {
        if timeout_secs < MIN_REQUEST_TIMEOUT_SECS {
            return Err(InsightsError::config(format!(
                "request timeout must be at least {MIN_REQUEST_TIMEOUT_SECS} seconds, got {timeout_secs}"
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InsightsError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            client,
            wait_secs: statement_wait_secs(timeout_secs),
        })
    }

    fn statement_request(&self, sql: &str, warehouse_id: &str) -> StatementRequest {
        StatementRequest {
            statement: sql.to_string(),
            warehouse_id: warehouse_id.to_string(),
            catalog: Some(self.credentials.catalog().to_string()),
            schema: Some(self.credentials.schema().to_string()),
            disposition: "INLINE",
            format: "JSON_ARRAY",
            wait_timeout: format!("{}s", self.wait_secs),
            on_wait_timeout: "CANCEL",
        }
    }

    /// Sends a request and decodes a JSON body, mapping non-2xx to errors.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .header("Authorization", self.credentials.bearer())
            .send()
            .await
            .map_err(|e| InsightsError::transport(format!("Warehouse request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InsightsError::transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| InsightsError::transport(format!("Failed to parse response: {}", e)))
    }

    async fn fetch_chunk(&self, statement_id: &str, chunk_index: u32) -> Result<ChunkResponse> {
        let url = self
            .credentials
            .api_base()?
            .join(&format!(
                "sql/statements/{}/result/chunks/{}",
                statement_id, chunk_index
            ))
            .map_err(|e| InsightsError::internal(format!("Invalid chunk URL: {}", e)))?;

        debug!("Fetching result chunk {} of {}", chunk_index, statement_id);
        self.send_json(self.client.get(url)).await
    }

    /// Best-effort cancellation of a statement we are abandoning.
    async fn cancel(&self, statement_id: &str) {
        let Ok(base) = self.credentials.api_base() else {
            return;
        };
        let Ok(url) = base.join(&format!("sql/statements/{}/cancel", statement_id)) else {
            return;
        };
        if let Err(e) = self
            .client
            .post(url)
            .header("Authorization", self.credentials.bearer())
            .send()
            .await
        {
            warn!("Failed to cancel statement {}: {}", statement_id, e);
        }
    }
}

#[async_trait]
impl WarehouseClient for DatabricksSqlClient {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.credentials.ensure_configured()?;
        let warehouse_id = self.credentials.warehouse_id().ok_or_else(|| {
            InsightsError::config("HTTP path does not name a SQL warehouse")
        })?;
        let url = self
            .credentials
            .api_base()?
            .join("sql/statements")
            .map_err(|e| InsightsError::internal(format!("Invalid statements URL: {}", e)))?;

        let start = Instant::now();
        let request = self.statement_request(sql, warehouse_id);
        let response: StatementResponse = self
            .send_json(self.client.post(url).json(&request))
            .await?;

        let statement_id = response.statement_id.clone().unwrap_or_default();
        let state = response
            .status
            .as_ref()
            .map(|s| s.state.as_str())
            .unwrap_or("UNKNOWN");

        match state {
            "SUCCEEDED" => {}
            "PENDING" | "RUNNING" => {
                if !statement_id.is_empty() {
                    self.cancel(&statement_id).await;
                }
                return Err(InsightsError::query(format!(
                    "Statement did not finish within {} seconds",
                    self.wait_secs
                )));
            }
            other => {
                let message = response
                    .status
                    .as_ref()
                    .and_then(|s| s.error.as_ref())
                    .and_then(|e| e.message.clone())
                    .unwrap_or_else(|| format!("Statement ended in state {}", other));
                return Err(InsightsError::query(message));
            }
        }

        let columns: Vec<ColumnInfo> = response
            .manifest
            .as_ref()
            .and_then(|m| m.schema.as_ref())
            .map(|schema| {
                schema
                    .columns
                    .iter()
                    .map(|c| ColumnInfo::new(&c.name, c.type_name.as_deref().unwrap_or("STRING")))
                    .collect()
            })
            .unwrap_or_default();

        let mut rows: Vec<Row> = Vec::new();
        let mut next_chunk = None;
        if let Some(result) = response.result {
            append_rows(&mut rows, &columns, result.data_array);
            next_chunk = result.next_chunk_index;
        }

        while let Some(index) = next_chunk {
            let chunk = self.fetch_chunk(&statement_id, index).await?;
            append_rows(&mut rows, &columns, chunk.data_array);
            next_chunk = chunk.next_chunk_index;
        }

        let execution_time = start.elapsed();
        info!(
            "Statement {} returned {} rows in {:?}",
            statement_id,
            rows.len(),
            execution_time
        );

        Ok(QueryResult::with_data(columns, rows).with_execution_time(execution_time))
    }
}

fn statement_wait_secs(timeout_secs: u64) -> u64 {
    timeout_secs
        .saturating_sub(5)
        .clamp(MIN_WAIT_SECS, MAX_WAIT_SECS)
}

fn append_rows(rows: &mut Vec<Row>, columns: &[ColumnInfo], data: Option<Vec<Vec<Option<String>>>>) {
    for raw in data.unwrap_or_default() {
        rows.push(
            raw.into_iter()
                .enumerate()
                .map(|(i, cell)| {
                    let type_name = columns.get(i).map(|c| c.data_type.as_str()).unwrap_or("STRING");
                    convert_cell(type_name, cell)
                })
                .collect(),
        );
    }
}

/// Converts one `JSON_ARRAY` cell (always a string) into a typed value.
fn convert_cell(type_name: &str, cell: Option<String>) -> Value {
    let Some(raw) = cell else {
        return Value::Null;
    };

    match type_name.to_uppercase().as_str() {
        "BYTE" | "SHORT" | "INT" | "LONG" => raw
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or(Value::String(raw)),
        "FLOAT" | "DOUBLE" | "DECIMAL" => raw
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or(Value::String(raw)),
        "BOOLEAN" => raw
            .parse::<bool>()
            .map(Value::Bool)
            .unwrap_or(Value::String(raw)),
        _ => Value::String(raw),
    }
}

/// Maps an error response to an [`InsightsError`].
///
/// Authentication and server failures are transport errors; a 4xx carrying
/// an API message is treated as a statement problem.
fn parse_error(status: StatusCode, body: &str) -> InsightsError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return InsightsError::transport(format!(
            "Authentication failed ({}). Check DATABRICKS_ACCESS_TOKEN.",
            status
        ));
    }

    let api_message = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|e| e.message);

    match api_message {
        Some(message) if status.is_client_error() => InsightsError::query(message),
        Some(message) => InsightsError::transport(format!("Warehouse API error ({}): {}", status, message)),
        None => InsightsError::transport(format!("Warehouse API error ({}): {}", status, body)),
    }
}

// Statement Execution API wire types

#[derive(Debug, Serialize)]
struct StatementRequest {
    statement: String,
    warehouse_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<String>,
    disposition: &'static str,
    format: &'static str,
    wait_timeout: String,
    on_wait_timeout: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: Option<String>,
    status: Option<StatementStatus>,
    manifest: Option<StatementManifest>,
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementManifest {
    schema: Option<ResultSchema>,
}

#[derive(Debug, Deserialize)]
struct ResultSchema {
    #[serde(default)]
    columns: Vec<ResultColumn>,
}

#[derive(Debug, Deserialize)]
struct ResultColumn {
    name: String,
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    data_array: Option<Vec<Vec<Option<String>>>>,
    next_chunk_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    data_array: Option<Vec<Vec<Option<String>>>>,
    next_chunk_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
}
