//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `FLEETQL_*` environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::collection::CollectionEngine;
use crate::ops::{OperationSettings, Operations};
use crate::source::{HttpSource, InMemorySource, RecordSource, SourceResult};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query engine limits
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_bulk_row_cap")]
    pub bulk_row_cap: usize,

    #[serde(default = "default_export_buffer_rows")]
    pub export_buffer_rows: usize,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_max_page_size() -> usize {
    1000
}

fn default_page_size() -> usize {
    1000
}

fn default_bulk_row_cap() -> usize {
    100_000
}

fn default_export_buffer_rows() -> usize {
    256
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            default_page_size: default_page_size(),
            bulk_row_cap: default_bulk_row_cap(),
            export_buffer_rows: default_export_buffer_rows(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl EngineConfig {
    /// Paging engine with these limits
    pub fn collection_engine(&self) -> CollectionEngine {
        CollectionEngine::new(self.max_page_size, self.default_page_size)
    }

    /// Dispatch settings with these limits
    pub fn operation_settings(&self) -> OperationSettings {
        OperationSettings {
            bulk_row_cap: self.bulk_row_cap.max(1),
            export_buffer_rows: self.export_buffer_rows.max(1),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
        }
    }
}

/// Where records come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// JSON fixture file loaded into memory
    Fixture,
    /// Upstream REST service
    Http,
}

/// Record source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_backend")]
    pub backend: SourceBackend,

    #[serde(default)]
    pub fixture_path: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_backend() -> SourceBackend {
    SourceBackend::Fixture
}

fn default_base_url() -> String {
    "http://localhost:8090/ws/v1".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            fixture_path: None,
            base_url: default_base_url(),
        }
    }
}

impl SourceConfig {
    /// Build the configured record source
    pub fn build(&self, timeout: Duration) -> SourceResult<Arc<dyn RecordSource>> {
        match self.backend {
            SourceBackend::Fixture => match &self.fixture_path {
                Some(path) => Ok(Arc::new(InMemorySource::load(Path::new(path))?)),
                None => {
                    tracing::warn!("No fixture_path configured, serving an empty fleet");
                    Ok(Arc::new(InMemorySource::new()))
                }
            },
            SourceBackend::Http => Ok(Arc::new(HttpSource::new(&self.base_url, timeout)?)),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8086
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ApiConfig {
    /// Socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Operation dispatcher over the configured source and limits
    pub fn operations(&self) -> SourceResult<Operations> {
        let settings = self.engine.operation_settings();
        let source = self.source.build(settings.fetch_timeout)?;
        Ok(Operations::new(source, self.engine.collection_engine(), settings))
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("fleetql").join("config.toml")),
            Some(PathBuf::from("/etc/fleetql/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        // Engine
        if let Some(n) = parsed(var("FLEETQL_MAX_PAGE_SIZE")) {
            self.engine.max_page_size = n;
        }
        if let Some(n) = parsed(var("FLEETQL_DEFAULT_PAGE_SIZE")) {
            self.engine.default_page_size = n;
        }
        if let Some(n) = parsed(var("FLEETQL_BULK_ROW_CAP")) {
            self.engine.bulk_row_cap = n;
        }
        if let Some(n) = parsed(var("FLEETQL_FETCH_TIMEOUT_SECS")) {
            self.engine.fetch_timeout_secs = n;
        }

        // Source
        match var("FLEETQL_SOURCE").as_deref().map(str::trim) {
            Some("fixture") => self.source.backend = SourceBackend::Fixture,
            Some("http") => self.source.backend = SourceBackend::Http,
            Some(other) => tracing::warn!("Ignoring unknown FLEETQL_SOURCE '{}'", other),
            None => {}
        }
        if let Some(path) = var("FLEETQL_FIXTURE") {
            self.source.fixture_path = Some(path);
        }
        if let Some(url) = var("FLEETQL_BASE_URL") {
            self.source.base_url = url;
        }

        // API
        if let Some(host) = var("FLEETQL_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = parsed(var("FLEETQL_API_PORT")) {
            self.api.port = port;
        }

        // Logging
        if let Some(level) = var("FLEETQL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("FLEETQL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# fleetql Configuration
#
# Environment variables override these settings:
# - FLEETQL_MAX_PAGE_SIZE, FLEETQL_DEFAULT_PAGE_SIZE
# - FLEETQL_BULK_ROW_CAP, FLEETQL_FETCH_TIMEOUT_SECS
# - FLEETQL_SOURCE, FLEETQL_FIXTURE, FLEETQL_BASE_URL
# - FLEETQL_API_HOST, FLEETQL_API_PORT
# - FLEETQL_LOG_LEVEL, FLEETQL_LOG_FORMAT

[engine]
# Largest page a caller may request
max_page_size = 1000

# Page size when the caller gives none
default_page_size = 1000

# Maximum rows in one bulk export
bulk_row_cap = 100000

# CSV lines rendered ahead of a slow reader
export_buffer_rows = 256

# Bound on each record source call (seconds)
fetch_timeout_secs = 30

[source]
# Record source: fixture (JSON file) or http (upstream service)
backend = "fixture"

# Fixture file mapping resource names to record arrays
# fixture_path = "./fixtures/fleet.json"

# Upstream base URL for the http backend
base_url = "http://localhost:8090/ws/v1"

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8086

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.engine.max_page_size, defaults.engine.max_page_size);
        assert_eq!(config.engine.bulk_row_cap, defaults.engine.bulk_row_cap);
        assert_eq!(config.source.backend, SourceBackend::Fixture);
        assert_eq!(config.source.base_url, defaults.source.base_url);
        assert_eq!(config.api.port, defaults.api.port);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nmax_page_size = 50\n\n[source]\nbackend = \"http\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.engine.max_page_size, 50);
        assert_eq!(config.engine.default_page_size, 1000);
        assert_eq!(config.source.backend, SourceBackend::Http);
        assert_eq!(config.engine.collection_engine().clamp_size(None), 50);
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/fleetql.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[engine\nbroken").unwrap();
        assert!(matches!(Config::load(file.path()).unwrap_err(), ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FLEETQL_MAX_PAGE_SIZE", "25"),
            ("FLEETQL_SOURCE", "http"),
            ("FLEETQL_BASE_URL", "http://upstream"),
            ("FLEETQL_API_PORT", "not-a-port"),
            ("FLEETQL_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.engine.max_page_size, 25);
        assert_eq!(config.source.backend, SourceBackend::Http);
        assert_eq!(config.source.base_url, "http://upstream");
        assert_eq!(config.api.port, 8086);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_fixture_source_from_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"devices": [{{"id": "d1", "name": "edge"}}]}}"#).unwrap();

        let mut config = Config::default();
        config.source.fixture_path = Some(file.path().display().to_string());
        let ops = config.operations().unwrap();
        assert_eq!(ops.source_name(), "memory");

        config.source.fixture_path = Some("/nonexistent/fleet.json".to_string());
        assert!(config.operations().is_err());

        config.source.backend = SourceBackend::Http;
        assert_eq!(config.operations().unwrap().source_name(), "http");
    }

    #[test]
    fn test_operation_settings_floor() {
        let engine = EngineConfig {
            bulk_row_cap: 0,
            fetch_timeout_secs: 0,
            ..EngineConfig::default()
        };
        let settings = engine.operation_settings();
        assert_eq!(settings.bulk_row_cap, 1);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(1));
    }
}
