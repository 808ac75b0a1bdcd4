//! Driver configuration for one MongoDB connection.

use std::time::Duration;

use docmap_schema::ConnectionConfig;
use mongodb::options::{self, ClientOptions, SelectionCriteria};

use crate::error::{MongoError, MongoResult};

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_APP_NAME: &str = "docmap";

/// MongoDB connection configuration.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Read preference.
    pub read_preference: Option<ReadPreference>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
}

/// MongoDB read preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPreference {
    /// Read from primary only.
    #[default]
    Primary,
    /// Read from primary, fall back to a secondary.
    PrimaryPreferred,
    /// Read from a secondary only.
    Secondary,
    /// Read from a secondary, fall back to the primary.
    SecondaryPreferred,
    /// Read from the nearest member.
    Nearest,
}

impl ReadPreference {
    fn to_criteria(self) -> SelectionCriteria {
        let pref = match self {
            Self::Primary => options::ReadPreference::Primary,
            Self::PrimaryPreferred => options::ReadPreference::PrimaryPreferred {
                options: Default::default(),
            },
            Self::Secondary => options::ReadPreference::Secondary {
                options: Default::default(),
            },
            Self::SecondaryPreferred => options::ReadPreference::SecondaryPreferred {
                options: Default::default(),
            },
            Self::Nearest => options::ReadPreference::Nearest {
                options: Default::default(),
            },
        };
        SelectionCriteria::ReadPreference(pref)
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some(DEFAULT_APP_NAME.to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            read_preference: Some(ReadPreference::Primary),
            direct_connection: None,
        }
    }
}

impl MongoConfig {
    /// Create a configuration from a URI and database name.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a configuration from a `[connections.<name>]` entry of `docmap.toml`.
    pub fn from_connection(connection: &ConnectionConfig) -> MongoResult<Self> {
        let mut builder = Self::builder()
            .uri(connection.uri.clone())
            .database(connection.database.clone());

        if let Some(app_name) = &connection.app_name {
            builder = builder.app_name(app_name.clone());
        }
        if let Some(size) = connection.min_pool_size {
            builder = builder.min_pool_size(size);
        }
        if let Some(size) = connection.max_pool_size {
            builder = builder.max_pool_size(size);
        }
        if let Some(ms) = connection.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = connection.server_selection_timeout_ms {
            builder = builder.server_selection_timeout(Duration::from_millis(ms));
        }
        if let Some(direct) = connection.direct_connection {
            builder = builder.direct_connection(direct);
        }

        builder.build()
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Convert to driver client options.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }
        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }
        if let Some(timeout) = self.connect_timeout {
            options.connect_timeout = Some(timeout);
        }
        if let Some(timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(timeout);
        }
        if let Some(pref) = self.read_preference {
            options.selection_criteria = Some(pref.to_criteria());
        }
        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

/// Builder for [`MongoConfig`].
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    read_preference: Option<ReadPreference>,
    direct_connection: Option<bool>,
}

impl MongoConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Set the read preference.
    pub fn read_preference(mut self, pref: ReadPreference) -> Self {
        self.read_preference = Some(pref);
        self
    }

    /// Enable direct connection.
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the configuration. The database name is required.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let database = self
            .database
            .filter(|db| !db.is_empty())
            .ok_or_else(|| MongoError::config("database name is required"))?;

        Ok(MongoConfig {
            uri: self.uri.unwrap_or_else(|| DEFAULT_URI.to_string()),
            database,
            app_name: self.app_name.or(Some(DEFAULT_APP_NAME.to_string())),
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size.or(Some(10)),
            connect_timeout: self.connect_timeout.or(Some(Duration::from_secs(10))),
            server_selection_timeout: self
                .server_selection_timeout
                .or(Some(Duration::from_secs(30))),
            read_preference: self.read_preference.or(Some(ReadPreference::Primary)),
            direct_connection: self.direct_connection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_schema::DocmapConfig;

    #[test]
    fn test_config_builder() {
        let config = MongoConfig::builder()
            .database("blog")
            .app_name("blog-api")
            .max_pool_size(20)
            .build()
            .unwrap();

        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "blog");
        assert_eq!(config.app_name.as_deref(), Some("blog-api"));
        assert_eq!(config.max_pool_size, Some(20));
    }

    #[test]
    fn test_config_builder_missing_database() {
        assert!(MongoConfig::builder().build().is_err());
        assert!(MongoConfig::builder().database("").build().is_err());
    }

    #[test]
    fn test_from_connection() {
        let file = DocmapConfig::from_str(
            r#"
            [connections.default]
            uri = "mongodb://db.internal:27017"
            database = "blog"
            max_pool_size = 4
            connect_timeout_ms = 2500
            "#,
        )
        .unwrap();

        let config = MongoConfig::from_connection(file.default_connection().unwrap()).unwrap();
        assert_eq!(config.uri, "mongodb://db.internal:27017");
        assert_eq!(config.database, "blog");
        assert_eq!(config.app_name.as_deref(), Some("docmap"));
        assert_eq!(config.max_pool_size, Some(4));
        assert_eq!(config.connect_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_read_preference_default() {
        assert_eq!(ReadPreference::default(), ReadPreference::Primary);
    }
}
