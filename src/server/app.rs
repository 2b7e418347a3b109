use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::queries::InsightQuery;
use crate::server::handlers::{
    check_tables, databricks_config, get_insights_output, health, insight_query, pipeline_status,
    refresh_insights, trigger_insights_notebook, trigger_pipeline,
};
use crate::server::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let mut router: Router<AppState> = Router::new()
        .route("/api/health", get(health))
        .route("/api/databricks-config", get(databricks_config))
        .route("/api/insights/check-tables", get(check_tables))
        .route(
            "/api/pipeline/trigger-insights-notebook",
            post(trigger_insights_notebook),
        )
        .route(
            "/api/pipeline/get-insights-output/:run_id",
            get(get_insights_output),
        )
        .route("/api/pipeline/refresh-insights", post(refresh_insights))
        .route("/api/pipeline/trigger-real", post(trigger_pipeline))
        .route("/api/pipeline/status-real/:run_id", get(pipeline_status));

    for query in InsightQuery::ALL {
        router = router.route(
            &format!("/api/insights/{}", query.slug()),
            get(move |State(state): State<AppState>| insight_query(state, query)),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
