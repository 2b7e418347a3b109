//! Remote notebook job integration.
//!
//! Wraps the Jobs REST API behind a trait so the insight façade can be
//! tested against scripted runs.

mod databricks;
mod mock;
mod types;

pub use databricks::DatabricksJobsClient;
pub use mock::MockJobClient;
pub use types::{JobRun, LifeCycleState, NotebookOutput, ResultState, RunId, RunOutput};

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Trait for clients of the Jobs service.
///
/// Every call is a single attempt with a bounded timeout; retry policy is
/// left to the caller.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submits a one-task run of the notebook at `notebook_path`.
    async fn submit(&self, notebook_path: &str, timeout: Duration) -> Result<RunId>;

    /// Fetches the current snapshot of a run.
    async fn get_status(&self, run_id: &RunId) -> Result<JobRun>;

    /// Fetches the recorded output of a run.
    async fn get_output(&self, run_id: &RunId) -> Result<RunOutput>;
}
