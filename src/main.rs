//! Retail Insights - backend API for the retail pipeline dashboard.

use std::sync::Arc;

use retail_insights::cli::Cli;
use retail_insights::config::Config;
use retail_insights::error::{InsightsError, Result};
use retail_insights::insights::InsightsFacade;
use retail_insights::jobs::DatabricksJobsClient;
use retail_insights::logging::{init_file_logging, init_stderr_logging};
use retail_insights::server::{bind_listener, build_router, shutdown_signal, AppState};
use retail_insights::warehouse::DatabricksSqlClient;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let env_loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };

    match cli.log_path() {
        Some(path) => {
            if let Err(e) = init_file_logging(&path) {
                init_stderr_logging();
                warn!("{}", e);
            }
        }
        None => init_stderr_logging(),
    }

    // A missing ./.env is normal; an explicit --env-file is not.
    if let (Some(path), Err(e)) = (&cli.env_file, env_loaded) {
        warn!("Could not load environment from {}: {}", path.display(), e);
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Precedence: CLI > environment > config file > defaults.
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides();
    cli.apply_to(&mut config);
    config.validate()?;

    let credentials = Arc::new(config.credentials()?);
    if credentials.is_configured() {
        info!("Databricks: {}", credentials.display_string());
    } else {
        warn!("Databricks not configured; data endpoints will return errors");
    }

    let request_timeout = config.jobs.request_timeout_secs;
    let warehouse = DatabricksSqlClient::with_timeout(Arc::clone(&credentials), request_timeout)?;
    let jobs = DatabricksJobsClient::with_timeout(Arc::clone(&credentials), request_timeout)?;

    info!("Using {} insight queries", config.queries.version);
    let facade = InsightsFacade::new(
        Arc::new(warehouse),
        Arc::new(jobs),
        config.jobs.clone(),
        config.queries.version,
    );
    let app = build_router(AppState::new(facade, credentials));

    let listener = bind_listener(&config.server.host, config.server.port).await?;
    info!("Listening on {}:{}", config.server.host, config.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| InsightsError::internal(format!("Server error: {e}")))
}
