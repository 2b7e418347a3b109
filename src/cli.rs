//! Command-line argument parsing for the dashboard server.

use crate::config::Config;
use crate::queries::QueryVersion;
use clap::Parser;
use std::path::PathBuf;

/// Backend API for the retail pipeline dashboard.
#[derive(Parser, Debug)]
#[command(name = "retail-insights")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short = 'H', long, value_name = "HOST", env = "INSIGHTS_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, value_name = "PORT", env = "INSIGHTS_PORT")]
    pub port: Option<u16>,

    /// Insight query templates to run (original or fixed)
    #[arg(long, value_name = "VERSION")]
    pub query_version: Option<QueryVersion>,

    /// Write logs to a file instead of stderr (default location if no path given)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub log_file: Option<Option<PathBuf>>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Resolves the log file path, if file logging was requested.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_ref()
            .map(|p| p.clone().unwrap_or_else(crate::logging::default_log_path))
    }

    /// Applies CLI overrides, which take precedence over file and environment.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(version) = self.query_version {
            config.queries.version = version;
        }
    }
}
