//! Error types for the insights backend.
//!
//! Every client and the insight façade return [`InsightsError`]; nothing is
//! allowed to escape as a panic past the façade.

use thiserror::Error;

/// Main error type for insights operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsightsError {
    /// Credentials are incomplete (host, HTTP path, or token missing).
    #[error("Databricks not configured")]
    NotConfigured,

    /// Network failures, timeouts, and non-2xx responses from either external API.
    #[error("Transport error: {0}")]
    Transport(String),

    /// SQL execution errors surfaced by the warehouse.
    #[error("Query error: {0}")]
    Query(String),

    /// A run reported a life-cycle state outside PENDING/RUNNING/TERMINATED.
    #[error("Unexpected job state: {0}")]
    UnexpectedJobState(String),

    /// The run succeeded but no insights payload could be produced.
    #[error("Could not retrieve insights data: {0}")]
    OutputUnavailable(String),

    /// The run terminated without a SUCCESS result state.
    #[error("Notebook execution failed: {0}")]
    JobFailed(String),

    /// Configuration errors (invalid config file, bad identifiers, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InsightsError {
    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates an unexpected-job-state error for the given state.
    pub fn unexpected_job_state(state: impl Into<String>) -> Self {
        Self::UnexpectedJobState(state.into())
    }

    /// Creates an output-unavailable error with the given message.
    pub fn output_unavailable(msg: impl Into<String>) -> Self {
        Self::OutputUnavailable(msg.into())
    }

    /// Creates a job-failed error carrying the run's state message.
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the message without the category prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::NotConfigured => "Databricks not configured".to_string(),
            Self::Transport(msg)
            | Self::Query(msg)
            | Self::UnexpectedJobState(msg)
            | Self::OutputUnavailable(msg)
            | Self::JobFailed(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg.clone(),
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotConfigured => "Not Configured",
            Self::Transport(_) => "Transport Error",
            Self::Query(_) => "Query Error",
            Self::UnexpectedJobState(_) => "Unexpected Job State",
            Self::OutputUnavailable(_) => "Output Unavailable",
            Self::JobFailed(_) => "Job Failed",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using InsightsError.
pub type Result<T> = std::result::Result<T, InsightsError>;
