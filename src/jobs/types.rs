//! Job run types.
//!
//! Snapshots of runs as observed through the Jobs API. The external system
//! owns run state; these values are never mutated locally.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque run identifier assigned by the Jobs service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for RunId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RunId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // The API sends run ids as int64, but tolerate strings as well.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(id) => RunId::from(id),
            Raw::Str(id) => RunId(id),
        })
    }
}

/// Coarse progress stage of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifeCycleState {
    Pending,
    Running,
    Terminated,
    /// Any state outside the three the façade understands.
    Other(String),
}

impl LifeCycleState {
    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "TERMINATED" => Self::Terminated,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Terminated => "TERMINATED",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for LifeCycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LifeCycleState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of a terminated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultState {
    Success,
    Failed,
    Other(String),
}

impl ResultState {
    pub fn parse(s: &str) -> Self {
        match s {
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResultState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Point-in-time snapshot of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRun {
    pub run_id: RunId,
    pub life_cycle_state: LifeCycleState,
    pub result_state: Option<ResultState>,
    pub state_message: Option<String>,
    /// Epoch milliseconds.
    pub start_time: Option<i64>,
    /// Epoch milliseconds; zero or absent while running.
    pub end_time: Option<i64>,
}

impl JobRun {
    /// Builds a snapshot with only the states set, as tests and mocks need.
    pub fn new(
        run_id: impl Into<RunId>,
        life_cycle_state: LifeCycleState,
        result_state: Option<ResultState>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            life_cycle_state,
            result_state,
            state_message: None,
            start_time: None,
            end_time: None,
        }
    }
}

/// Recorded output of a finished run (`runs/get-output`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    #[serde(default)]
    pub notebook_output: Option<NotebookOutput>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl RunOutput {
    /// Output carrying a notebook exit value.
    pub fn with_result(result: impl Into<String>) -> Self {
        Self {
            notebook_output: Some(NotebookOutput {
                result: Some(result.into()),
                truncated: false,
            }),
            ..Self::default()
        }
    }
}

/// Value passed to `dbutils.notebook.exit()` by the notebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookOutput {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub truncated: bool,
}
