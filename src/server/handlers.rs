use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};

use crate::error::InsightsError;
use crate::insights::{InsightResolution, NotebookKind};
use crate::jobs::RunId;
use crate::queries::InsightQuery;
use crate::server::models::{
    ConfigStatusResponse, ErrorResponse, HealthResponse, InsightsOutputResponse, QueryResponse,
    RefreshResponse, RunStatusResponse, RunningResponse, TablesResponse, TriggerPipelineRequest,
    TriggerResponse,
};
use crate::server::state::AppState;

/// Wraps any failure into the `{status: "error", message}` envelope.
///
/// Every failure maps to 500; configuration problems are not distinguished.
pub struct ApiError {
    message: String,
}

impl ApiError {
    fn with_context(context: &str, err: &InsightsError) -> Self {
        Self {
            message: format!("{context}: {}", err.detail()),
        }
    }
}

impl From<InsightsError> for ApiError {
    fn from(err: InsightsError) -> Self {
        let message = match &err {
            InsightsError::Transport(_)
            | InsightsError::Query(_)
            | InsightsError::Config(_)
            | InsightsError::Internal(_) => err.detail(),
            _ => err.to_string(),
        };
        Self { message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                status: "error",
                message: self.message,
            }),
        )
            .into_response()
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Retail Pipeline Dashboard API is running",
    })
}

pub async fn databricks_config(State(state): State<AppState>) -> Json<ConfigStatusResponse> {
    let creds = &state.credentials;
    Json(ConfigStatusResponse {
        configured: creds.is_configured(),
        server_hostname: Some(creds.host().to_string()).filter(|h| !h.is_empty()),
        has_http_path: !creds.http_path().is_empty(),
        has_access_token: !creds.access_token().is_empty(),
    })
}

pub async fn insight_query(
    state: AppState,
    query: InsightQuery,
) -> Result<Json<QueryResponse>, ApiError> {
    let result = state.facade.run_query(query).await.map_err(|e| {
        error!("{} query failed: {}", query.slug(), e);
        ApiError::from(e)
    })?;

    Ok(Json(QueryResponse {
        status: "success",
        data: result.records(),
        insight: query.label(),
    }))
}

pub async fn check_tables(State(state): State<AppState>) -> Result<Json<TablesResponse>, ApiError> {
    let tables = state.facade.check_tables().await.map_err(|e| {
        error!("Table check failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(TablesResponse {
        status: "success",
        schema: state.credentials.schema().to_string(),
        tables,
    }))
}

pub async fn trigger_insights_notebook(
    State(state): State<AppState>,
) -> Result<Json<TriggerResponse>, ApiError> {
    info!("Starting Insights Notebook execution...");
    let run = state
        .facade
        .trigger(NotebookKind::Insights)
        .await
        .map_err(|e| {
            error!("Insights notebook trigger failed: {}", e);
            ApiError::with_context("Failed to start insights notebook", &e)
        })?;

    Ok(Json(TriggerResponse {
        status: "success",
        message: "Insights notebook execution started".to_string(),
        run_id: run.run_id,
        notebook_path: run.notebook_path,
        pipeline_type: None,
    }))
}

pub async fn get_insights_output(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Response, ApiError> {
    let run_id = RunId::new(run_id);
    let resolution = state.facade.resolve(&run_id).await.map_err(|e| {
        error!("Failed to get insights output for run {}: {}", run_id, e);
        ApiError::from(e)
    })?;

    let response = match resolution {
        InsightResolution::Running {
            life_cycle_state,
            result_state,
        } => Json(RunningResponse {
            status: "running",
            message: format!("Job is still {}", life_cycle_state.as_str().to_lowercase()),
            life_cycle_state,
            result_state,
        })
        .into_response(),
        InsightResolution::Ready { payload, source } => Json(InsightsOutputResponse {
            status: "success",
            run_id,
            insights: payload,
            source,
        })
        .into_response(),
    };
    Ok(response)
}

pub async fn refresh_insights(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let payload = state.facade.refresh().await.map_err(|e| {
        error!("Failed to refresh insights: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(RefreshResponse {
        status: "success",
        insights: payload,
        source: crate::insights::InsightSource::TableQuery,
    }))
}

pub async fn trigger_pipeline(
    State(state): State<AppState>,
    payload: Option<Json<TriggerPipelineRequest>>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let pipeline_type = payload
        .and_then(|Json(p)| p.pipeline_type)
        .unwrap_or_else(|| "full".to_string());
    info!("Starting {} pipeline execution...", pipeline_type);

    let run = state
        .facade
        .trigger(NotebookKind::Pipeline)
        .await
        .map_err(|e| {
            error!("Pipeline trigger failed: {}", e);
            ApiError::with_context("Failed to start Databricks job", &e)
        })?;

    Ok(Json(TriggerResponse {
        status: "success",
        message: "Databricks pipeline execution started".to_string(),
        run_id: run.run_id,
        notebook_path: run.notebook_path,
        pipeline_type: Some(pipeline_type),
    }))
}

pub async fn pipeline_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunStatusResponse>, ApiError> {
    let run = state
        .facade
        .status(&RunId::new(run_id))
        .await
        .map_err(|e| {
            error!("Status check failed: {}", e);
            ApiError::with_context("Could not retrieve run status", &e)
        })?;

    Ok(Json(RunStatusResponse {
        status: "success",
        run_id: run.run_id,
        life_cycle_state: run.life_cycle_state,
        result_state: run.result_state,
        state_message: run.state_message,
        start_time: run.start_time,
        end_time: run.end_time,
    }))
}
