//! Configuration management for the insights backend.
//!
//! Handles loading configuration from a TOML file and `DATABRICKS_*`
//! environment variables, and builds the immutable [`Credentials`] value that
//! is injected into the warehouse and job clients.

use crate::error::{InsightsError, Result};
use crate::queries::QueryVersion;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

/// Smallest accepted `request_timeout_secs`.
///
/// The warehouse waits `timeout - 5` seconds (at least 5) before cancelling a
/// statement, which must finish before the HTTP request itself times out.
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 10;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Workspace connection settings.
    #[serde(default)]
    pub databricks: DatabricksConfig,

    /// Notebook job settings.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Query template settings.
    #[serde(default)]
    pub queries: QueriesConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_host")]
    pub host: String,

    #[serde(default = "default_bind_port")]
    pub port: u16,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_bind_port(),
        }
    }
}

/// Workspace connection settings as they appear in the config file.
///
/// Every field may be overridden from the environment; see
/// [`Config::apply_env_overrides`].
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabricksConfig {
    /// Workspace host, e.g. `adb-123.4.azuredatabricks.net`.
    pub server_hostname: Option<String>,

    /// SQL warehouse HTTP path, e.g. `/sql/1.0/warehouses/abc123`.
    pub http_path: Option<String>,

    /// Personal access token (prefer the environment over the file).
    pub access_token: Option<String>,

    #[serde(default = "default_catalog")]
    pub catalog: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    /// REST API base override, e.g. `https://proxy.internal/api/2.0/`.
    /// Defaults to `https://<server_hostname>/api/2.0/`.
    pub api_url: Option<String>,
}

fn default_catalog() -> String {
    "main".to_string()
}

fn default_schema() -> String {
    "default".to_string()
}

impl Default for DatabricksConfig {
    fn default() -> Self {
        Self {
            server_hostname: None,
            http_path: None,
            access_token: None,
            catalog: default_catalog(),
            schema: default_schema(),
            api_url: None,
        }
    }
}

impl fmt::Debug for DatabricksConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabricksConfig")
            .field("server_hostname", &self.server_hostname)
            .field("http_path", &self.http_path)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Notebook job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Workspace path of the insights notebook.
    #[serde(default = "default_insights_notebook")]
    pub insights_notebook_path: String,

    /// Workspace path of the full pipeline notebook.
    #[serde(default = "default_pipeline_notebook")]
    pub pipeline_notebook_path: String,

    /// Upper bound on a single notebook run, passed to the Jobs API.
    #[serde(default = "default_notebook_timeout")]
    pub notebook_timeout_secs: u64,

    /// Per-request timeout for every outbound API call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_insights_notebook() -> String {
    "/Workspace/Shared/online_retail_project_pipeline/05_Insights_and_Queries".to_string()
}

fn default_pipeline_notebook() -> String {
    "/Workspace/Shared/online_retail_project_pipeline/04_RUN_PIPELINE".to_string()
}

fn default_notebook_timeout() -> u64 {
    600
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            insights_notebook_path: default_insights_notebook(),
            pipeline_notebook_path: default_pipeline_notebook(),
            notebook_timeout_secs: default_notebook_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Query template configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct QueriesConfig {
    #[serde(default)]
    pub version: QueryVersion,
}

/// Connection credentials for the workspace.
///
/// Immutable once built. A value with an empty host, path, or token is
/// "not configured" and every client refuses to operate with it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    host: String,
    http_path: String,
    access_token: String,
    catalog: String,
    schema: String,
    api_url: Option<Url>,
}

impl Credentials {
    /// Creates credentials, validating the catalog and schema identifiers.
    ///
    /// Identifiers are sent to the warehouse as request fields, but they are
    /// still restricted to plain SQL identifiers since they only ever come
    /// from trusted configuration.
    pub fn new(
        host: impl Into<String>,
        http_path: impl Into<String>,
        access_token: impl Into<String>,
        catalog: impl Into<String>,
        schema: impl Into<String>,
    ) -> Result<Self> {
        let catalog = catalog.into();
        let schema = schema.into();
        validate_identifier("catalog", &catalog)?;
        validate_identifier("schema", &schema)?;

        Ok(Self {
            host: normalize_host(&host.into()),
            http_path: http_path.into().trim().to_string(),
            access_token: access_token.into().trim().to_string(),
            catalog,
            schema,
            api_url: None,
        })
    }

    /// Sends API calls to `api_url` instead of the workspace host.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self> {
        let mut url = Url::parse(api_url.trim())
            .map_err(|e| InsightsError::config(format!("Invalid API URL '{api_url}': {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.api_url = Some(url);
        Ok(self)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn http_path(&self) -> &str {
        &self.http_path
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Returns true when host, HTTP path, and token are all non-empty.
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.http_path.is_empty() && !self.access_token.is_empty()
    }

    /// Fails with [`InsightsError::NotConfigured`] unless fully configured.
    pub fn ensure_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(InsightsError::NotConfigured)
        }
    }

    /// Returns the SQL warehouse id, the last segment of the HTTP path.
    pub fn warehouse_id(&self) -> Option<&str> {
        self.http_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
    }

    /// Builds the REST API base URL (`https://<host>/api/2.0/` unless overridden).
    pub fn api_base(&self) -> Result<Url> {
        self.ensure_configured()?;
        if let Some(url) = &self.api_url {
            return Ok(url.clone());
        }
        Url::parse(&format!("https://{}/api/2.0/", self.host))
            .map_err(|e| InsightsError::config(format!("Invalid server hostname: {e}")))
    }

    /// Returns the `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Returns a display-safe string (no token) for logs.
    pub fn display_string(&self) -> String {
        let host = if self.host.is_empty() {
            "<unset>"
        } else {
            &self.host
        };
        format!("{}.{} @ {}", self.catalog, self.schema, host)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("http_path", &self.http_path)
            .field("access_token", &"***")
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("api_url", &self.api_url.as_ref().map(Url::as_str))
            .finish()
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    host.trim_end_matches('/').to_string()
}

fn validate_identifier(kind: &str, value: &str) -> Result<()> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(InsightsError::config(format!(
            "invalid {kind} identifier '{value}'"
        )))
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("retail-insights")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file, or defaults if it does not exist.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| InsightsError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            InsightsError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.request_timeout_secs < MIN_REQUEST_TIMEOUT_SECS {
            return Err(InsightsError::config(format!(
                "request_timeout_secs must be at least {MIN_REQUEST_TIMEOUT_SECS}, got {}",
                self.jobs.request_timeout_secs
            )));
        }
        Ok(())
    }

    /// Applies `DATABRICKS_*` environment variables over file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let db = &mut self.databricks;

        if let Some(v) = get("DATABRICKS_SERVER_HOSTNAME") {
            db.server_hostname = Some(v);
        }
        if let Some(v) = get("DATABRICKS_HTTP_PATH") {
            db.http_path = Some(v);
        }
        if let Some(v) = get("DATABRICKS_ACCESS_TOKEN") {
            db.access_token = Some(v);
        }
        if let Some(v) = get("DATABRICKS_CATALOG") {
            db.catalog = v;
        }
        if let Some(v) = get("DATABRICKS_SCHEMA") {
            db.schema = v;
        }
        if let Some(v) = get("DATABRICKS_API_URL") {
            db.api_url = Some(v);
        }
    }

    /// Builds the immutable credentials from the loaded settings.
    ///
    /// Missing connection fields produce an unconfigured value rather than an
    /// error, so the server can still start and report its state.
    pub fn credentials(&self) -> Result<Credentials> {
        let db = &self.databricks;
        let credentials = Credentials::new(
            db.server_hostname.clone().unwrap_or_default(),
            db.http_path.clone().unwrap_or_default(),
            db.access_token.clone().unwrap_or_default(),
            db.catalog.clone(),
            db.schema.clone(),
        )?;
        match db.api_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => credentials.with_api_url(url),
            None => Ok(credentials),
        }
    }
}
