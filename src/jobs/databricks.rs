//! Databricks Jobs API client.
//!
//! Implements [`JobClient`] against `/api/2.0/jobs/runs/*` with bearer-token
//! auth. Each call is a single attempt; any non-200 response or transport
//! error is surfaced immediately.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

use super::{JobClient, JobRun, LifeCycleState, ResultState, RunId, RunOutput};
use crate::config::Credentials;
use crate::error::{InsightsError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Task key used for every submitted one-task run.
const TASK_KEY: &str = "run-insights-notebook";

/// Jobs API client.
#[derive(Debug, Clone)]
pub struct DatabricksJobsClient {
    credentials: Arc<Credentials>,
    client: Client,
}

impl DatabricksJobsClient {
    /// Creates a client with the default 30 second request timeout.
    pub fn new(credentials: Arc<Credentials>) -> Result<Self> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client whose requests time out after `timeout_secs`.
    pub fn with_timeout(credentials: Arc<Credentials>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InsightsError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<url::Url> {
        self.credentials
            .api_base()?
            .join(path)
            .map_err(|e| InsightsError::internal(format!("Invalid Jobs API URL: {}", e)))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .header("Authorization", self.credentials.bearer())
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("Error calling Jobs API ({}): {}", what, e);
                InsightsError::transport(format!("Jobs API request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InsightsError::transport(format!("Failed to read response: {}", e)))?;

        if status != StatusCode::OK {
            error!("Failed to {}: {} - {}", what, status, body);
            return Err(parse_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| InsightsError::transport(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl JobClient for DatabricksJobsClient {
    async fn submit(&self, notebook_path: &str, timeout: Duration) -> Result<RunId> {
        self.credentials.ensure_configured()?;
        let url = self.endpoint("jobs/runs/submit")?;
        let request = SubmitRequest::one_task(notebook_path, timeout, unix_seconds());

        info!("Submitting job for notebook: {}", notebook_path);
        let response: SubmitResponse = self
            .send_json("start notebook", self.client.post(url).json(&request))
            .await?;

        info!("Notebook execution started. Run ID: {}", response.run_id);
        Ok(response.run_id)
    }

    async fn get_status(&self, run_id: &RunId) -> Result<JobRun> {
        self.credentials.ensure_configured()?;
        let url = self.endpoint("jobs/runs/get")?;

        let response: RunGetResponse = self
            .send_json(
                "get run status",
                self.client.get(url).query(&[("run_id", run_id.as_str())]),
            )
            .await?;

        let run = response.into_job_run(run_id);
        info!(
            "Run {} status: {} - {}",
            run_id,
            run.life_cycle_state,
            run.result_state
                .as_ref()
                .map(ResultState::as_str)
                .unwrap_or("None")
        );
        Ok(run)
    }

    async fn get_output(&self, run_id: &RunId) -> Result<RunOutput> {
        self.credentials.ensure_configured()?;
        let url = self.endpoint("jobs/runs/get-output")?;

        let output: RunOutput = self
            .send_json(
                "get run output",
                self.client.get(url).query(&[("run_id", run_id.as_str())]),
            )
            .await?;

        debug!(
            "Got run output for {} (notebook output present: {})",
            run_id,
            output.notebook_output.is_some()
        );
        Ok(output)
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn parse_error(status: StatusCode, body: &str) -> InsightsError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return InsightsError::transport(format!(
            "Authentication failed ({}). Check DATABRICKS_ACCESS_TOKEN.",
            status
        ));
    }

    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(body) {
        if let Some(message) = api_error.message {
            return InsightsError::transport(format!("Jobs API error ({}): {}", status, message));
        }
    }

    InsightsError::transport(format!("Jobs API error ({}): {}", status, body))
}

// Jobs API wire types

#[derive(Debug, Serialize)]
struct SubmitRequest {
    run_name: String,
    tasks: Vec<SubmitTask>,
}

#[derive(Debug, Serialize)]
struct SubmitTask {
    task_key: &'static str,
    notebook_task: NotebookTask,
    timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct NotebookTask {
    notebook_path: String,
    base_parameters: serde_json::Map<String, serde_json::Value>,
}

impl SubmitRequest {
    fn one_task(notebook_path: &str, timeout: Duration, now_secs: u64) -> Self {
        Self {
            run_name: format!("Insights-Notebook-{}", now_secs),
            tasks: vec![SubmitTask {
                task_key: TASK_KEY,
                notebook_task: NotebookTask {
                    notebook_path: notebook_path.to_string(),
                    base_parameters: serde_json::Map::new(),
                },
                timeout_seconds: timeout.as_secs(),
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    run_id: RunId,
}

#[derive(Debug, Deserialize)]
struct RunGetResponse {
    #[serde(default)]
    state: RunStateWire,
    start_time: Option<i64>,
    end_time: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RunStateWire {
    life_cycle_state: Option<String>,
    result_state: Option<String>,
    state_message: Option<String>,
}

impl RunGetResponse {
    fn into_job_run(self, run_id: &RunId) -> JobRun {
        JobRun {
            run_id: run_id.clone(),
            life_cycle_state: LifeCycleState::parse(
                self.state.life_cycle_state.as_deref().unwrap_or(""),
            ),
            result_state: self.state.result_state.as_deref().map(ResultState::parse),
            state_message: self.state.state_message.filter(|m| !m.is_empty()),
            start_time: self.start_time,
            end_time: self.end_time.filter(|t| *t > 0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
}
