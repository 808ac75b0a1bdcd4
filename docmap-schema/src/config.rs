//! Configuration file parsing for `docmap.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{SchemaError, SchemaResult};

/// Name of the connection used when an entity does not specify one.
pub const DEFAULT_CONNECTION: &str = "default";

/// Main configuration structure for `docmap.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocmapConfig {
    /// Named database connections.
    #[serde(default)]
    pub connections: IndexMap<String, ConnectionConfig>,

    /// Value casting behavior.
    #[serde(default)]
    pub casting: CastingConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,
}

impl DocmapConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })?;
        config.validate()?;
        Ok(config)
    }

    /// Get a connection by name.
    pub fn connection(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections.get(name)
    }

    /// Get the `default` connection.
    pub fn default_connection(&self) -> Option<&ConnectionConfig> {
        self.connection(DEFAULT_CONNECTION)
    }

    fn validate(&self) -> SchemaResult<()> {
        for (name, conn) in &self.connections {
            if conn.database.trim().is_empty() {
                return Err(SchemaError::config(format!(
                    "connection `{}` has an empty database name",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// A single named connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection URI (supports `${ENV_VAR}` interpolation).
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database name.
    pub database: String,

    /// Application name reported to the server.
    pub app_name: Option<String>,

    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,

    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,

    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,

    /// Server selection timeout in milliseconds.
    pub server_selection_timeout_ms: Option<u64>,

    /// Connect directly to a single host.
    pub direct_connection: Option<bool>,
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

/// Value casting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CastingConfig {
    /// Turn cast diagnostics into errors instead of keeping the raw value.
    #[serde(default)]
    pub strict: bool,

    /// Log cast diagnostics at `warn` level.
    #[serde(default = "default_true")]
    pub log_diagnostics: bool,
}

impl Default for CastingConfig {
    fn default() -> Self {
        Self {
            strict: false,
            log_diagnostics: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Debug/logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format (json, pretty, compact).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Expand environment variables in the format `${VAR_NAME}`.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return result;
    };

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}
