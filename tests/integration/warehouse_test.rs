//! Live warehouse tests.
//!
//! Skipped unless DATABRICKS_SERVER_HOSTNAME, DATABRICKS_HTTP_PATH and
//! DATABRICKS_ACCESS_TOKEN are set.

use std::sync::Arc;

use retail_insights::config::Config;
use retail_insights::warehouse::{check_tables, DatabricksSqlClient, Value, WarehouseClient};

/// Helper to create a client from the environment, if configured.
fn get_test_client() -> Option<DatabricksSqlClient> {
    let mut config = Config::default();
    config.apply_env_overrides();
    let credentials = config.credentials().ok()?;
    if !credentials.is_configured() {
        return None;
    }
    DatabricksSqlClient::new(Arc::new(credentials)).ok()
}

#[tokio::test]
async fn test_execute_simple_select() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABRICKS_* not set");
        return;
    };

    let result = client
        .execute("SELECT 1 AS num, 'hello' AS greeting")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::String("hello".to_string()));
}

#[tokio::test]
async fn test_execute_null_and_float() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABRICKS_* not set");
        return;
    };

    let result = client
        .execute("SELECT CAST(NULL AS STRING) AS missing, CAST(1.5 AS DOUBLE) AS ratio")
        .await
        .unwrap();

    assert_eq!(result.rows[0][0], Value::Null);
    assert_eq!(result.rows[0][1], Value::Float(1.5));
}

#[tokio::test]
async fn test_invalid_sql_is_query_error() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABRICKS_* not set");
        return;
    };

    let err = client.execute("SELEC nonsense").await.unwrap_err();
    assert_eq!(err.category(), "Query Error");
}

#[tokio::test]
async fn test_check_tables_lists_star_schema() {
    let Some(client) = get_test_client() else {
        eprintln!("Skipping test: DATABRICKS_* not set");
        return;
    };

    let tables = check_tables(&client).await.unwrap();
    assert_eq!(tables.len(), 4);
    assert!(tables.contains_key("fact_sales"));
}
