//! Insight façade.
//!
//! Triggers the insights notebook, tracks a run to completion, and resolves
//! an [`InsightsPayload`] either from the run's recorded output or, when that
//! is missing or unparseable, from direct warehouse queries. Each call makes
//! at most one pass through the external systems; there are no retries and
//! nothing is cached between requests.

mod parser;
mod payload;

pub use parser::{parse_insights_json, parse_run_output, ParseFailure};
pub use payload::{CountrySales, InsightResolution, InsightSource, InsightsPayload, TopProduct};

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::JobsConfig;
use crate::error::{InsightsError, Result};
use crate::jobs::{JobClient, JobRun, LifeCycleState, ResultState, RunId};
use crate::queries::{InsightQuery, QueryVersion};
use crate::warehouse::{check_tables, QueryResult, TableStatus, WarehouseClient};

/// Which configured notebook to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotebookKind {
    /// The insights notebook whose output the façade resolves.
    Insights,
    /// The full ETL pipeline notebook.
    Pipeline,
}

/// A freshly submitted run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggeredRun {
    pub run_id: RunId,
    pub notebook_path: String,
}

/// Resolves insights for the dashboard.
///
/// Cheap to clone; all collaborators are shared and immutable.
#[derive(Clone)]
pub struct InsightsFacade {
    warehouse: Arc<dyn WarehouseClient>,
    jobs: Arc<dyn JobClient>,
    notebooks: Arc<JobsConfig>,
    version: QueryVersion,
}

impl InsightsFacade {
    pub fn new(
        warehouse: Arc<dyn WarehouseClient>,
        jobs: Arc<dyn JobClient>,
        notebooks: JobsConfig,
        version: QueryVersion,
    ) -> Self {
        Self {
            warehouse,
            jobs,
            notebooks: Arc::new(notebooks),
            version,
        }
    }

    /// Submits the configured notebook of the given kind.
    pub async fn trigger(&self, kind: NotebookKind) -> Result<TriggeredRun> {
        let notebook_path = match kind {
            NotebookKind::Insights => &self.notebooks.insights_notebook_path,
            NotebookKind::Pipeline => &self.notebooks.pipeline_notebook_path,
        };
        let timeout = Duration::from_secs(self.notebooks.notebook_timeout_secs);

        let run_id = self.jobs.submit(notebook_path, timeout).await?;
        Ok(TriggeredRun {
            run_id,
            notebook_path: notebook_path.clone(),
        })
    }

    /// Returns the current snapshot of a run.
    pub async fn status(&self, run_id: &RunId) -> Result<JobRun> {
        self.jobs.get_status(run_id).await
    }

    /// Resolves the insights for a run.
    ///
    /// Returns `Running` while the run is pending or running. A terminated run
    /// without SUCCESS fails with its state message, and any other life-cycle
    /// state fails as unexpected.
    pub async fn resolve(&self, run_id: &RunId) -> Result<InsightResolution> {
        let run = self.jobs.get_status(run_id).await.map_err(|e| match e {
            InsightsError::NotConfigured => e,
            other => {
                warn!("Status lookup for run {} failed: {}", run_id, other);
                InsightsError::transport(format!(
                    "Could not retrieve run status: {}",
                    other.detail()
                ))
            }
        })?;

        match &run.life_cycle_state {
            LifeCycleState::Pending | LifeCycleState::Running => {
                Ok(InsightResolution::Running {
                    life_cycle_state: run.life_cycle_state.clone(),
                    result_state: run.result_state.clone(),
                })
            }
            LifeCycleState::Terminated => match &run.result_state {
                Some(ResultState::Success) => self.resolve_succeeded(run_id).await,
                _ => Err(InsightsError::job_failed(
                    run.state_message
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string()),
                )),
            },
            LifeCycleState::Other(state) => Err(InsightsError::unexpected_job_state(state.clone())),
        }
    }

    async fn resolve_succeeded(&self, run_id: &RunId) -> Result<InsightResolution> {
        match self.jobs.get_output(run_id).await {
            Ok(output) => match parse_run_output(&output) {
                Ok(payload) => {
                    info!("Resolved insights for run {} from notebook output", run_id);
                    return Ok(InsightResolution::Ready {
                        payload,
                        source: InsightSource::NotebookOutput,
                    });
                }
                Err(reason) => info!("Run {}: {}, querying tables directly", run_id, reason),
            },
            Err(e) => warn!(
                "Could not get output for run {}: {}, querying tables directly",
                run_id, e
            ),
        }

        let payload = self.query_tables().await?;
        Ok(InsightResolution::Ready {
            payload,
            source: InsightSource::TableQuery,
        })
    }

    /// Builds the payload from the warehouse without involving any run.
    pub async fn refresh(&self) -> Result<InsightsPayload> {
        info!("Refreshing insights from tables...");
        self.query_tables().await
    }

    /// Runs the two fallback queries, stopping at the first failure.
    async fn query_tables(&self) -> Result<InsightsPayload> {
        let fallback = |e: InsightsError| match e {
            InsightsError::NotConfigured => e,
            other => {
                warn!("Error querying insights from tables: {}", other);
                InsightsError::output_unavailable(other.detail())
            }
        };

        let top_products = self
            .warehouse
            .execute(InsightQuery::TopProducts.sql(self.version))
            .await
            .map_err(fallback)?;
        let sales_by_country = self
            .warehouse
            .execute(InsightQuery::SalesByCountry.sql(self.version))
            .await
            .map_err(fallback)?;

        let payload = InsightsPayload::from_query_results(&top_products, &sales_by_country);
        info!(
            "Retrieved {} products and {} countries",
            payload.top_products.len(),
            payload.sales_by_country.len()
        );
        Ok(payload)
    }

    /// Runs one of the fixed dashboard queries synchronously.
    pub async fn run_query(&self, query: InsightQuery) -> Result<QueryResult> {
        let result = self.warehouse.execute(query.sql(self.version)).await?;
        info!("{} query returned {} results", query.slug(), result.row_count);
        Ok(result)
    }

    /// Probes the star-schema tables.
    pub async fn check_tables(&self) -> Result<BTreeMap<String, TableStatus>> {
        check_tables(self.warehouse.as_ref()).await
    }
}
