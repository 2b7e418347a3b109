//! Mock job client for testing.
//!
//! Returns scripted snapshots and outputs, and counts every call so tests
//! can assert which Jobs API operations a flow touched.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{JobClient, JobRun, LifeCycleState, ResultState, RunId, RunOutput};
use crate::error::{InsightsError, Result};

#[derive(Debug, Default)]
struct Calls {
    submit: AtomicUsize,
    status: AtomicUsize,
    output: AtomicUsize,
    submitted: Mutex<Vec<(String, Duration)>>,
}

/// Scripted [`JobClient`].
///
/// Without scripting, `submit` returns run `"1"`, `get_status` fails, and
/// `get_output` fails.
#[derive(Debug, Clone)]
pub struct MockJobClient {
    submit_result: Result<RunId>,
    status: Option<Result<JobRun>>,
    output: Result<RunOutput>,
    calls: Arc<Calls>,
}

impl Default for MockJobClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockJobClient {
    pub fn new() -> Self {
        Self {
            submit_result: Ok(RunId::from("1")),
            status: None,
            output: Err(InsightsError::transport("no output scripted")),
            calls: Arc::default(),
        }
    }

    /// Scripts the run id (or error) returned by `submit`.
    pub fn with_submit(mut self, result: Result<RunId>) -> Self {
        self.submit_result = result;
        self
    }

    /// Scripts `get_status` to report the given states for any run id.
    pub fn with_states(
        mut self,
        life_cycle_state: &str,
        result_state: Option<&str>,
        state_message: Option<&str>,
    ) -> Self {
        let mut run = JobRun::new(
            "scripted",
            LifeCycleState::parse(life_cycle_state),
            result_state.map(ResultState::parse),
        );
        run.state_message = state_message.map(str::to_string);
        self.status = Some(Ok(run));
        self
    }

    /// Scripts `get_status` to fail.
    pub fn with_status_error(mut self, error: InsightsError) -> Self {
        self.status = Some(Err(error));
        self
    }

    /// Scripts the result of `get_output`.
    pub fn with_output(mut self, output: Result<RunOutput>) -> Self {
        self.output = output;
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.calls.submit.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.calls.status.load(Ordering::SeqCst)
    }

    pub fn output_calls(&self) -> usize {
        self.calls.output.load(Ordering::SeqCst)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.submit_calls() + self.status_calls() + self.output_calls()
    }

    /// Notebook paths and timeouts passed to `submit`, in order.
    pub fn submitted(&self) -> Vec<(String, Duration)> {
        self.calls
            .submitted
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobClient for MockJobClient {
    async fn submit(&self, notebook_path: &str, timeout: Duration) -> Result<RunId> {
        self.calls.submit.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut submitted) = self.calls.submitted.lock() {
            submitted.push((notebook_path.to_string(), timeout));
        }
        self.submit_result.clone()
    }

    async fn get_status(&self, run_id: &RunId) -> Result<JobRun> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        match &self.status {
            Some(Ok(run)) => Ok(JobRun {
                run_id: run_id.clone(),
                ..run.clone()
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(InsightsError::transport(format!(
                "no status scripted for run {}",
                run_id
            ))),
        }
    }

    async fn get_output(&self, _run_id: &RunId) -> Result<RunOutput> {
        self.calls.output.fetch_add(1, Ordering::SeqCst);
        self.output.clone()
    }
}
