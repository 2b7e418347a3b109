//! Real client tests against an in-process stand-in for the Databricks REST API.
//!
//! The stub answers scripted JSON per `METHOD path` and records every request,
//! so the clients' response handling runs end to end over HTTP.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use retail_insights::config::{Credentials, JobsConfig};
use retail_insights::error::InsightsError;
use retail_insights::insights::{InsightResolution, InsightSource, InsightsFacade};
use retail_insights::jobs::{DatabricksJobsClient, JobClient, LifeCycleState, ResultState, RunId};
use retail_insights::queries::QueryVersion;
use retail_insights::warehouse::{DatabricksSqlClient, Value, WarehouseClient};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;

#[derive(Default)]
struct StubApi {
    routes: HashMap<String, (StatusCode, JsonValue)>,
    requests: Mutex<Vec<(String, String)>>,
}

impl StubApi {
    fn on(mut self, method: Method, path: &str, status: StatusCode, body: JsonValue) -> Self {
        self.routes
            .insert(format!("{method} /api/2.0/{path}"), (status, body));
        self
    }

    /// `METHOD path` of every request received, in order.
    fn hits(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn body_of(&self, key: &str) -> JsonValue {
        let requests = self.requests.lock().unwrap();
        let (_, body) = requests.iter().find(|(k, _)| k == key).unwrap();
        serde_json::from_str(body).unwrap()
    }
}

async fn respond(
    State(stub): State<Arc<StubApi>>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, Json<JsonValue>) {
    let key = format!("{method} {}", uri.path());
    stub.requests.lock().unwrap().push((key.clone(), body));
    match stub.routes.get(&key) {
        Some((status, body)) => (*status, Json(body.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error_code": "ENDPOINT_NOT_FOUND", "message": format!("no route {key}")})),
        ),
    }
}

/// Serves the stub on an ephemeral port and returns credentials pointing at it.
async fn start(stub: StubApi) -> (Arc<Credentials>, Arc<StubApi>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stub = Arc::new(stub);
    let app = Router::new().fallback(respond).with_state(Arc::clone(&stub));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let credentials = Credentials::new(
        "adb-123.azuredatabricks.net",
        "/sql/1.0/warehouses/wh42",
        "dapi-test",
        "main",
        "retail_db",
    )
    .unwrap()
    .with_api_url(&format!("http://{addr}/api/2.0/"))
    .unwrap();
    (Arc::new(credentials), stub)
}

fn product_columns() -> JsonValue {
    json!({"schema": {"columns": [
        {"name": "Description", "type_name": "STRING", "position": 0},
        {"name": "total_quantity_sold", "type_name": "LONG", "position": 1}
    ]}})
}

#[tokio::test]
async fn test_statement_follows_chunks() {
    let stub = StubApi::default()
        .on(
            Method::POST,
            "sql/statements",
            StatusCode::OK,
            json!({
                "statement_id": "st-1",
                "status": {"state": "SUCCEEDED"},
                "manifest": product_columns(),
                "result": {"data_array": [["JUMBO BAG RED RETROSPOT", "47363"]], "next_chunk_index": 1}
            }),
        )
        .on(
            Method::GET,
            "sql/statements/st-1/result/chunks/1",
            StatusCode::OK,
            json!({"chunk_index": 1, "data_array": [["REGENCY CAKESTAND 3 TIER", null]]}),
        );
    let (credentials, stub) = start(stub).await;
    let client = DatabricksSqlClient::new(credentials).unwrap();

    let result = client.execute("SELECT 1").await.unwrap();

    assert_eq!(result.row_count, 2);
    assert_eq!(result.columns[1].name, "total_quantity_sold");
    assert_eq!(result.rows[0][1], Value::Int(47363));
    assert_eq!(result.rows[1][0], Value::from("REGENCY CAKESTAND 3 TIER"));
    assert_eq!(result.rows[1][1], Value::Null);
    assert_eq!(
        stub.hits(),
        vec![
            "POST /api/2.0/sql/statements".to_string(),
            "GET /api/2.0/sql/statements/st-1/result/chunks/1".to_string(),
        ]
    );

    let request = stub.body_of("POST /api/2.0/sql/statements");
    assert_eq!(request["warehouse_id"], "wh42");
    assert_eq!(request["schema"], "retail_db");
    assert_eq!(request["statement"], "SELECT 1");
}

#[tokio::test]
async fn test_statement_zero_rows_is_empty_result() {
    let stub = StubApi::default().on(
        Method::POST,
        "sql/statements",
        StatusCode::OK,
        json!({
            "statement_id": "st-2",
            "status": {"state": "SUCCEEDED"},
            "manifest": product_columns(),
            "result": {}
        }),
    );
    let (credentials, _stub) = start(stub).await;
    let client = DatabricksSqlClient::new(credentials).unwrap();

    let result = client.execute("SELECT 1").await.unwrap();

    assert!(result.is_empty());
    assert_eq!(result.row_count, 0);
    assert_eq!(result.columns.len(), 2);
}

#[tokio::test]
async fn test_failed_statement_is_query_error() {
    let stub = StubApi::default().on(
        Method::POST,
        "sql/statements",
        StatusCode::OK,
        json!({
            "statement_id": "st-3",
            "status": {
                "state": "FAILED",
                "error": {"error_code": "BAD_REQUEST", "message": "[TABLE_OR_VIEW_NOT_FOUND] fact_sales"}
            }
        }),
    );
    let (credentials, _stub) = start(stub).await;
    let client = DatabricksSqlClient::new(credentials).unwrap();

    assert_eq!(
        client.execute("SELECT 1").await,
        Err(InsightsError::query("[TABLE_OR_VIEW_NOT_FOUND] fact_sales"))
    );
}

#[tokio::test]
async fn test_canceled_statement_without_message() {
    let stub = StubApi::default().on(
        Method::POST,
        "sql/statements",
        StatusCode::OK,
        json!({"statement_id": "st-4", "status": {"state": "CANCELED"}}),
    );
    let (credentials, _stub) = start(stub).await;
    let client = DatabricksSqlClient::new(credentials).unwrap();

    assert_eq!(
        client.execute("SELECT 1").await,
        Err(InsightsError::query("Statement ended in state CANCELED"))
    );
}

#[tokio::test]
async fn test_unfinished_statement_is_cancelled() {
    let stub = StubApi::default()
        .on(
            Method::POST,
            "sql/statements",
            StatusCode::OK,
            json!({"statement_id": "st-9", "status": {"state": "PENDING"}}),
        )
        .on(
            Method::POST,
            "sql/statements/st-9/cancel",
            StatusCode::OK,
            json!({}),
        );
    let (credentials, stub) = start(stub).await;
    let client = DatabricksSqlClient::new(credentials).unwrap();

    let err = client.execute("SELECT 1").await.unwrap_err();

    assert_eq!(err, InsightsError::query("Statement did not finish within 25 seconds"));
    assert!(stub
        .hits()
        .contains(&"POST /api/2.0/sql/statements/st-9/cancel".to_string()));
}

#[tokio::test]
async fn test_statement_http_errors() {
    let stub = StubApi::default().on(
        Method::POST,
        "sql/statements",
        StatusCode::BAD_REQUEST,
        json!({"error_code": "INVALID_PARAMETER_VALUE", "message": "warehouse wh42 is stopped"}),
    );
    let (credentials, _stub) = start(stub).await;
    let client = DatabricksSqlClient::new(credentials).unwrap();
    assert_eq!(
        client.execute("SELECT 1").await,
        Err(InsightsError::query("warehouse wh42 is stopped"))
    );

    let stub = StubApi::default().on(
        Method::POST,
        "sql/statements",
        StatusCode::UNAUTHORIZED,
        json!({"message": "Invalid access token"}),
    );
    let (credentials, _stub) = start(stub).await;
    let client = DatabricksSqlClient::new(credentials).unwrap();
    let err = client.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.category(), "Transport Error");
    assert!(err.to_string().contains("Authentication failed"));
}

#[tokio::test]
async fn test_jobs_submit_status_and_output() {
    let stub = StubApi::default()
        .on(
            Method::POST,
            "jobs/runs/submit",
            StatusCode::OK,
            json!({"run_id": 455644833}),
        )
        .on(
            Method::GET,
            "jobs/runs/get",
            StatusCode::OK,
            json!({
                "run_id": 455644833,
                "state": {"life_cycle_state": "TERMINATED", "result_state": "SUCCESS", "state_message": ""},
                "start_time": 1625060460483_i64,
                "end_time": 1625060863413_i64
            }),
        )
        .on(
            Method::GET,
            "jobs/runs/get-output",
            StatusCode::OK,
            json!({"notebook_output": {"result": "done", "truncated": false}}),
        );
    let (credentials, stub) = start(stub).await;
    let client = DatabricksJobsClient::new(credentials).unwrap();

    let run_id = client
        .submit("/Workspace/Shared/05_Insights", Duration::from_secs(600))
        .await
        .unwrap();
    assert_eq!(run_id, RunId::from(455644833));

    let submitted = stub.body_of("POST /api/2.0/jobs/runs/submit");
    assert_eq!(
        submitted["tasks"][0]["notebook_task"]["notebook_path"],
        "/Workspace/Shared/05_Insights"
    );
    assert_eq!(submitted["tasks"][0]["timeout_seconds"], 600);

    let run = client.get_status(&run_id).await.unwrap();
    assert_eq!(run.life_cycle_state, LifeCycleState::Terminated);
    assert_eq!(run.result_state, Some(ResultState::Success));
    assert_eq!(run.state_message, None);
    assert_eq!(run.end_time, Some(1625060863413));

    let output = client.get_output(&run_id).await.unwrap();
    assert_eq!(
        output.notebook_output.and_then(|n| n.result).as_deref(),
        Some("done")
    );
}

#[tokio::test]
async fn test_jobs_bad_request_is_transport_error() {
    let stub = StubApi::default().on(
        Method::POST,
        "jobs/runs/submit",
        StatusCode::BAD_REQUEST,
        json!({"error_code": "INVALID_PARAMETER_VALUE", "message": "Notebook not found"}),
    );
    let (credentials, _stub) = start(stub).await;
    let client = DatabricksJobsClient::new(credentials).unwrap();

    assert_eq!(
        client.submit("/Workspace/missing", Duration::from_secs(60)).await,
        Err(InsightsError::transport(
            "Jobs API error (400 Bad Request): Notebook not found"
        ))
    );
}

#[tokio::test]
async fn test_facade_falls_back_over_http() {
    let stub = StubApi::default()
        .on(
            Method::GET,
            "jobs/runs/get",
            StatusCode::OK,
            json!({"state": {"life_cycle_state": "TERMINATED", "result_state": "SUCCESS"}}),
        )
        .on(
            Method::GET,
            "jobs/runs/get-output",
            StatusCode::OK,
            json!({"metadata": {"run_id": 123}}),
        )
        .on(
            Method::POST,
            "sql/statements",
            StatusCode::OK,
            json!({
                "statement_id": "st-5",
                "status": {"state": "SUCCEEDED"},
                "manifest": product_columns(),
                "result": {"data_array": [["WORLD WAR 2 GLIDERS ASSTD DESIGNS", "53847"]]}
            }),
        );
    let (credentials, stub) = start(stub).await;
    let facade = InsightsFacade::new(
        Arc::new(DatabricksSqlClient::new(Arc::clone(&credentials)).unwrap()),
        Arc::new(DatabricksJobsClient::new(credentials).unwrap()),
        JobsConfig::default(),
        QueryVersion::Fixed,
    );

    let resolution = facade.resolve(&RunId::from("run_123")).await.unwrap();
    let InsightResolution::Ready { payload, source } = resolution else {
        panic!("expected a payload, got {:?}", resolution);
    };

    assert_eq!(source, InsightSource::TableQuery);
    assert_eq!(payload.top_products[0].total_quantity_sold, 53847);
    let statements = stub
        .hits()
        .into_iter()
        .filter(|hit| hit == "POST /api/2.0/sql/statements")
        .count();
    assert_eq!(statements, 2);
}
