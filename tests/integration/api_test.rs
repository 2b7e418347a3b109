//! HTTP API tests.
//!
//! Drives the router with `oneshot` requests against mock clients and checks
//! the JSON envelopes.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use retail_insights::config::{Credentials, JobsConfig};
use retail_insights::error::InsightsError;
use retail_insights::insights::InsightsFacade;
use retail_insights::jobs::{JobClient, MockJobClient, RunId, RunOutput};
use retail_insights::queries::QueryVersion;
use retail_insights::server::{build_router, AppState};
use retail_insights::warehouse::{
    ColumnInfo, FailingWarehouseClient, MockWarehouseClient, QueryResult, Value, WarehouseClient,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt;

fn configured() -> Arc<Credentials> {
    Arc::new(
        Credentials::new(
            "adb-123.azuredatabricks.net",
            "/sql/1.0/warehouses/abc123",
            "dapi-secret",
            "main",
            "retail_db",
        )
        .unwrap(),
    )
}

fn unconfigured() -> Arc<Credentials> {
    Arc::new(Credentials::new("", "", "", "main", "default").unwrap())
}

fn router(
    warehouse: impl WarehouseClient + 'static,
    jobs: impl JobClient + 'static,
    credentials: Arc<Credentials>,
) -> Router {
    let facade = InsightsFacade::new(
        Arc::new(warehouse),
        Arc::new(jobs),
        JobsConfig::default(),
        QueryVersion::Fixed,
    );
    build_router(AppState::new(facade, credentials))
}

fn sales_warehouse() -> MockWarehouseClient {
    MockWarehouseClient::new()
        .with_result(
            "total_quantity_sold",
            QueryResult::with_data(
                vec![
                    ColumnInfo::new("Description", "STRING"),
                    ColumnInfo::new("total_quantity_sold", "LONG"),
                ],
                vec![
                    vec![Value::from("WORLD WAR 2 GLIDERS ASSTD DESIGNS"), Value::Int(53847)],
                    vec![Value::from("JUMBO BAG RED RETROSPOT"), Value::Int(47363)],
                ],
            ),
        )
        .with_result(
            "total_sales_revenue",
            QueryResult::with_data(
                vec![
                    ColumnInfo::new("Country", "STRING"),
                    ColumnInfo::new("total_sales_revenue", "DOUBLE"),
                ],
                vec![vec![Value::from("United Kingdom"), Value::Float(8187806.36)]],
            ),
        )
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Json>) -> (StatusCode, Json) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = router(MockWarehouseClient::new(), MockJobClient::new(), unconfigured());
    let (status, body) = send(app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_databricks_config_never_exposes_token() {
    let app = router(MockWarehouseClient::new(), MockJobClient::new(), configured());
    let (status, body) = send(app, Method::GET, "/api/databricks-config", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "configured": true,
            "server_hostname": "adb-123.azuredatabricks.net",
            "has_http_path": true,
            "has_access_token": true
        })
    );
    assert!(!body.to_string().contains("dapi-secret"));
}

#[tokio::test]
async fn test_databricks_config_unconfigured() {
    let app = router(MockWarehouseClient::new(), MockJobClient::new(), unconfigured());
    let (_, body) = send(app, Method::GET, "/api/databricks-config", None).await;

    assert_eq!(body["configured"], false);
    assert_eq!(body["server_hostname"], Json::Null);
    assert_eq!(body["has_access_token"], false);
}

#[tokio::test]
async fn test_top_products_returns_records() {
    let app = router(sales_warehouse(), MockJobClient::new(), configured());
    let (status, body) = send(app, Method::GET, "/api/insights/top-products", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["insight"], "Top 10 Best-Selling Products");
    assert_eq!(
        body["data"][0],
        json!({"Description": "WORLD WAR 2 GLIDERS ASSTD DESIGNS", "total_quantity_sold": 53847})
    );
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_every_insight_route_is_registered() {
    for slug in [
        "top-products",
        "sales-by-country",
        "recent-sales",
        "customer-insights",
        "product-performance",
    ] {
        let app = router(MockWarehouseClient::new(), MockJobClient::new(), configured());
        let (status, body) = send(app, Method::GET, &format!("/api/insights/{slug}"), None).await;
        assert_eq!(status, StatusCode::OK, "{slug}");
        assert_eq!(body["data"], json!([]), "{slug}");
    }
}

#[tokio::test]
async fn test_insight_query_failure_is_error_envelope() {
    let warehouse = FailingWarehouseClient::new(InsightsError::query("Table or view not found: fact_sales"));
    let app = router(warehouse, MockJobClient::new(), configured());
    let (status, body) = send(app, Method::GET, "/api/insights/recent-sales", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"status": "error", "message": "Table or view not found: fact_sales"})
    );
}

#[tokio::test]
async fn test_unconfigured_query_reports_not_configured() {
    let warehouse = FailingWarehouseClient::new(InsightsError::NotConfigured);
    let app = router(warehouse, MockJobClient::new(), unconfigured());
    let (status, body) = send(app, Method::GET, "/api/insights/top-products", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Databricks not configured");
}

#[tokio::test]
async fn test_check_tables_reports_each_table() {
    let warehouse = MockWarehouseClient::new()
        .with_result(
            "FROM fact_sales",
            QueryResult::with_data(
                vec![ColumnInfo::new("row_count", "LONG")],
                vec![vec![Value::Int(397884)]],
            ),
        )
        .with_error("FROM dim_date", "Table or view not found: dim_date");
    let app = router(warehouse, MockJobClient::new(), configured());
    let (status, body) = send(app, Method::GET, "/api/insights/check-tables", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schema"], "retail_db");
    assert_eq!(body["tables"]["fact_sales"], json!({"exists": true, "row_count": 397884}));
    assert_eq!(body["tables"]["dim_date"]["exists"], false);
    assert_eq!(body["tables"].as_object().unwrap().len(), 4);
}

#[tokio::test]
async fn test_trigger_insights_notebook() {
    let jobs = MockJobClient::new().with_submit(Ok(RunId::from("run_123")));
    let app = router(MockWarehouseClient::new(), jobs.clone(), configured());
    let (status, body) = send(
        app,
        Method::POST,
        "/api/pipeline/trigger-insights-notebook",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["run_id"], "run_123");
    assert_eq!(body["notebook_path"], JobsConfig::default().insights_notebook_path);
    assert_eq!(jobs.submit_calls(), 1);
}

#[tokio::test]
async fn test_trigger_failure_has_context() {
    let jobs = MockJobClient::new().with_submit(Err(InsightsError::transport("HTTP 503")));
    let app = router(MockWarehouseClient::new(), jobs, configured());
    let (status, body) = send(
        app,
        Method::POST,
        "/api/pipeline/trigger-insights-notebook",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to start insights notebook: HTTP 503");
}

#[tokio::test]
async fn test_output_while_running() {
    let jobs = MockJobClient::new().with_states("RUNNING", None, None);
    let app = router(sales_warehouse(), jobs.clone(), configured());
    let (status, body) = send(
        app,
        Method::GET,
        "/api/pipeline/get-insights-output/run_123",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["life_cycle_state"], "RUNNING");
    assert_eq!(body["message"], "Job is still running");
    assert_eq!(jobs.output_calls(), 0);
}

#[tokio::test]
async fn test_output_from_notebook() {
    let jobs = MockJobClient::new()
        .with_states("TERMINATED", Some("SUCCESS"), None)
        .with_output(Ok(RunOutput::with_result(
            r#"{"top_products": [{"Description": "X", "total_quantity_sold": 3}], "sales_by_country": []}"#,
        )));
    let warehouse = sales_warehouse();
    let app = router(warehouse.clone(), jobs, configured());
    let (status, body) = send(
        app,
        Method::GET,
        "/api/pipeline/get-insights-output/run_123",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["run_id"], "run_123");
    assert_eq!(body["source"], "notebook_output");
    assert_eq!(
        body["insights"],
        json!({
            "top_products": [{"Description": "X", "total_quantity_sold": 3}],
            "sales_by_country": []
        })
    );
    assert!(warehouse.executed().is_empty());
}

#[tokio::test]
async fn test_output_failed_run() {
    let jobs = MockJobClient::new().with_states("TERMINATED", Some("FAILED"), Some("Cell 3 raised"));
    let app = router(sales_warehouse(), jobs, configured());
    let (status, body) = send(
        app,
        Method::GET,
        "/api/pipeline/get-insights-output/run_123",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Notebook execution failed: Cell 3 raised");
}

#[tokio::test]
async fn test_refresh_insights_queries_tables() {
    let jobs = MockJobClient::new();
    let warehouse = sales_warehouse();
    let app = router(warehouse.clone(), jobs.clone(), configured());
    let (status, body) = send(app, Method::POST, "/api/pipeline/refresh-insights", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "table_query");
    assert_eq!(body["insights"]["top_products"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["insights"]["sales_by_country"][0]["Country"],
        "United Kingdom"
    );
    assert_eq!(jobs.total_calls(), 0);
    assert_eq!(warehouse.executed().len(), 2);
}

#[tokio::test]
async fn test_trigger_pipeline_defaults_to_full() {
    let jobs = MockJobClient::new().with_submit(Ok(RunId::from(42)));
    let app = router(MockWarehouseClient::new(), jobs.clone(), configured());
    let (status, body) = send(app, Method::POST, "/api/pipeline/trigger-real", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pipeline_type"], "full");
    assert_eq!(body["run_id"], "42");
    assert_eq!(
        jobs.submitted()[0].0,
        JobsConfig::default().pipeline_notebook_path
    );
}

#[tokio::test]
async fn test_trigger_pipeline_with_type() {
    let app = router(MockWarehouseClient::new(), MockJobClient::new(), configured());
    let (_, body) = send(
        app,
        Method::POST,
        "/api/pipeline/trigger-real",
        Some(json!({"pipeline_type": "incremental"})),
    )
    .await;

    assert_eq!(body["pipeline_type"], "incremental");
}

#[tokio::test]
async fn test_pipeline_status() {
    let jobs = MockJobClient::new().with_states("TERMINATED", Some("SUCCESS"), Some("done"));
    let app = router(MockWarehouseClient::new(), jobs, configured());
    let (status, body) = send(app, Method::GET, "/api/pipeline/status-real/77", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["life_cycle_state"], "TERMINATED");
    assert_eq!(body["result_state"], "SUCCESS");
    assert_eq!(body["state_message"], "done");
}

#[tokio::test]
async fn test_pipeline_status_failure() {
    let jobs = MockJobClient::new().with_status_error(InsightsError::transport("HTTP 404"));
    let app = router(MockWarehouseClient::new(), jobs, configured());
    let (status, body) = send(app, Method::GET, "/api/pipeline/status-real/77", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Could not retrieve run status: HTTP 404");
}
