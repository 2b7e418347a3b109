//! Mock warehouse clients for testing.
//!
//! Provides scripted, in-memory implementations that record every statement
//! they receive, so tests can assert exactly which queries were issued.

use super::{QueryResult, WarehouseClient};
use crate::error::{InsightsError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Scripted {
    Rows(QueryResult),
    Error(String),
}

/// A mock warehouse client that returns predefined results.
///
/// Responses are matched by case-insensitive substring against the
/// statement; the first match wins. Unmatched statements return an empty
/// result set.
#[derive(Debug, Clone, Default)]
pub struct MockWarehouseClient {
    responses: Vec<(String, Scripted)>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockWarehouseClient {
    /// Creates a new mock client that returns empty results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `result` for statements containing `pattern`.
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.responses
            .push((pattern.into().to_lowercase(), Scripted::Rows(result)));
        self
    }

    /// Fails statements containing `pattern` with a query error.
    pub fn with_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.push((
            pattern.into().to_lowercase(),
            Scripted::Error(message.into()),
        ));
        self
    }

    /// Returns every statement executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &str) {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.to_string());
        }
    }
}

#[async_trait]
impl WarehouseClient for MockWarehouseClient {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.record(sql);
        let sql_lower = sql.to_lowercase();

        let scripted = self
            .responses
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match scripted {
            Some(Scripted::Rows(result)) => {
                Ok(result.with_execution_time(Duration::from_millis(1)))
            }
            Some(Scripted::Error(message)) => Err(InsightsError::query(message)),
            None => Ok(QueryResult::new().with_execution_time(Duration::from_millis(1))),
        }
    }
}

/// A warehouse client whose every statement fails with the same error.
#[derive(Debug, Clone)]
pub struct FailingWarehouseClient {
    error: InsightsError,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FailingWarehouseClient {
    pub fn new(error: InsightsError) -> Self {
        Self {
            error,
            executed: Arc::default(),
        }
    }

    /// Returns every statement attempted so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WarehouseClient for FailingWarehouseClient {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.to_string());
        }
        Err(self.error.clone())
    }
}
