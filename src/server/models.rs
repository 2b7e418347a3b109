use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::insights::{InsightSource, InsightsPayload};
use crate::jobs::{LifeCycleState, ResultState, RunId};
use crate::warehouse::{Record, TableStatus};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ConfigStatusResponse {
    pub configured: bool,
    pub server_hostname: Option<String>,
    pub has_http_path: bool,
    pub has_access_token: bool,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub status: &'static str,
    pub data: Vec<Record>,
    pub insight: &'static str,
}

#[derive(Serialize)]
pub struct TablesResponse {
    pub status: &'static str,
    pub schema: String,
    pub tables: BTreeMap<String, TableStatus>,
}

#[derive(Deserialize, Default)]
pub struct TriggerPipelineRequest {
    pub pipeline_type: Option<String>,
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub message: String,
    pub run_id: RunId,
    pub notebook_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_type: Option<String>,
}

#[derive(Serialize)]
pub struct InsightsOutputResponse {
    pub status: &'static str,
    pub run_id: RunId,
    pub insights: InsightsPayload,
    pub source: InsightSource,
}

#[derive(Serialize)]
pub struct RunningResponse {
    pub status: &'static str,
    pub life_cycle_state: LifeCycleState,
    pub result_state: Option<ResultState>,
    pub message: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    pub insights: InsightsPayload,
    pub source: InsightSource,
}

#[derive(Serialize)]
pub struct RunStatusResponse {
    pub status: &'static str,
    pub run_id: RunId,
    pub life_cycle_state: LifeCycleState,
    pub result_state: Option<ResultState>,
    pub state_message: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}
