//! Configuration management for the diagram service.
//!
//! Parses `dg.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `object_store.url`
//! - `llm.endpoint`
//! - `llm.api_key`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "dg.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the SVG template directory.
    pub template_dir: Option<PathBuf>,
    /// Override the Mermaid CLI path.
    pub mermaid_cli_path: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server bind configuration.
    pub server: ServerConfig,
    /// Resource caps and timeouts.
    pub limits: LimitsConfig,
    /// Artifact cache sizing.
    pub cache: CacheConfig,
    /// Object store target. Absent means inline-only delivery.
    pub object_store: Option<ObjectStoreConfig>,
    /// Mermaid rendering configuration.
    pub mermaid: MermaidConfig,
    /// Chart execution configuration.
    pub charts: ChartsConfig,
    /// LLM path for Mermaid generation. Absent disables the LLM path.
    pub llm: Option<LlmConfig>,
    /// SVG template directory (in addition to the built-in set).
    pub templates: TemplatesConfig,
    /// Diagnostic verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: Option<String>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            cache: CacheConfig::default(),
            object_store: None,
            mermaid: MermaidConfig::default(),
            charts: ChartsConfig::default(),
            llm: None,
            templates: TemplatesConfig::default(),
            log_level: None,
            config_path: None,
        }
    }
}

/// Server bind configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8088,
        }
    }
}

/// Resource caps and timeouts.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Maximum concurrent requests per session.
    pub max_requests_per_session: usize,
    /// Per-request wall clock in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_requests_per_session: 10,
            request_timeout_ms: 60_000,
        }
    }
}

impl LimitsConfig {
    /// Per-request wall clock as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Artifact cache sizing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// LRU byte ceiling.
    pub bytes: usize,
    /// Per-entry TTL in milliseconds.
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bytes: 256 * 1024 * 1024,
            ttl_ms: 3_600_000,
        }
    }
}

impl CacheConfig {
    /// Per-entry TTL as a [`Duration`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Object store target.
#[derive(Debug, Deserialize)]
pub struct ObjectStoreConfig {
    /// Store base URL.
    pub url: String,
    /// Bucket name.
    pub bucket: String,
    /// When false, uploads are skipped and every response is inline.
    #[serde(default = "default_true")]
    pub public: bool,
}

/// Mermaid rendering configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MermaidConfig {
    /// Absolute path to the external Mermaid renderer. Absent means the
    /// DSL is returned unrendered.
    pub cli_path: Option<PathBuf>,
}

/// Chart execution configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    /// When false, chart requests always return source code.
    pub executor_enabled: bool,
    /// Python interpreter used by the executor.
    pub python_path: String,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            executor_enabled: false,
            python_path: "python3".to_owned(),
        }
    }
}

/// LLM path configuration.
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,
    /// API key, if the endpoint needs one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

/// Template directory configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory of `*.svg` templates, resolved against the config file.
    pub dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

fn default_temperature() -> f64 {
    0.2
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., `llm.api_key`).
        field: String,
        /// Error message (e.g., `${LLM_KEY} not set`).
        message: String,
    },
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `dg.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, so CLI arguments take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing
    /// fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(dir) = &settings.template_dir {
            self.templates.dir = Some(dir.clone());
        }
        if let Some(path) = &settings.mermaid_cli_path {
            self.mermaid.cli_path = Some(path.clone());
        }
    }

    /// Whether uploads should happen at all.
    #[must_use]
    pub fn uploads_enabled(&self) -> bool {
        self.object_store.as_ref().is_some_and(|store| store.public)
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand `${VAR}` syntax in secret-bearing string fields.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(store) = &mut self.object_store {
            store.url = expand::expand_env(&store.url, "object_store.url")?;
        }
        if let Some(llm) = &mut self.llm {
            llm.endpoint = expand::expand_env(&llm.endpoint, "llm.endpoint")?;
            if let Some(key) = &llm.api_key {
                llm.api_key = Some(expand::expand_env(key, "llm.api_key")?);
            }
        }
        Ok(())
    }

    /// Resolve relative paths against the config file's directory.
    fn resolve_paths(&mut self, base: &Path) {
        if let Some(dir) = &self.templates.dir
            && dir.is_relative()
        {
            self.templates.dir = Some(base.join(dir));
        }
    }

    /// Validate configuration invariants.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_connections == 0 {
            return Err(ConfigError::Validation(
                "limits.max_connections must be at least 1".to_owned(),
            ));
        }
        if self.limits.max_requests_per_session == 0 {
            return Err(ConfigError::Validation(
                "limits.max_requests_per_session must be at least 1".to_owned(),
            ));
        }
        if let Some(store) = &self.object_store {
            require_http_url(&store.url, "object_store.url")?;
            require_non_empty(&store.bucket, "object_store.bucket")?;
        }
        if let Some(llm) = &self.llm {
            require_http_url(&llm.endpoint, "llm.endpoint")?;
        }
        Ok(())
    }
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}
