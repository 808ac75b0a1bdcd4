//! Named connections and the entity-to-connection resolution.

use docmap_schema::{DEFAULT_CONNECTION, DocmapConfig, EntityMeta};
use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::info;

use crate::client::MongoClient;
use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};

/// Name of the connection an entity class is stored through.
///
/// The `@db` annotation when present and non-empty, `default` otherwise.
pub fn connection_name(meta: &EntityMeta) -> &str {
    meta.db()
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_CONNECTION)
}

/// A registry of named connections.
///
/// `C` is whatever the application uses as a connection handle: a
/// [`MongoClient`] in production, anything else in tests.
#[derive(Debug, Clone)]
pub struct Connections<C> {
    connections: IndexMap<SmolStr, C>,
}

impl<C> Default for Connections<C> {
    fn default() -> Self {
        Self {
            connections: IndexMap::new(),
        }
    }
}

impl<C> Connections<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<SmolStr>, connection: C) -> Option<C> {
        self.connections.insert(name.into(), connection)
    }

    /// Register a connection (builder style).
    pub fn with(mut self, name: impl Into<SmolStr>, connection: C) -> Self {
        self.insert(name, connection);
        self
    }

    /// Look up a connection by name.
    pub fn get(&self, name: &str) -> MongoResult<&C> {
        self.connections
            .get(name)
            .ok_or_else(|| MongoError::unknown_connection(name))
    }

    /// The `default` connection.
    pub fn default_connection(&self) -> MongoResult<&C> {
        self.get(DEFAULT_CONNECTION)
    }

    /// Resolve the connection of an entity class.
    pub fn for_entity(&self, meta: &EntityMeta) -> MongoResult<&C> {
        self.get(connection_name(meta))
    }

    /// Registered connection names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(SmolStr::as_str)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Connections<MongoClient> {
    /// Create a client for every connection configured in `docmap.toml`.
    pub async fn connect(config: &DocmapConfig) -> MongoResult<Self> {
        let mut connections = Self::new();
        for (name, connection) in &config.connections {
            let client = MongoClient::new(MongoConfig::from_connection(connection)?).await?;
            connections.insert(name.as_str(), client);
        }

        info!(count = connections.len(), "connections created");
        Ok(connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_connection_name() {
        let plain = EntityMeta::builder("Post").build().unwrap();
        assert_eq!(connection_name(&plain), "default");

        let reporting = EntityMeta::builder("Stat").db("reporting").build().unwrap();
        assert_eq!(connection_name(&reporting), "reporting");
    }

    #[test]
    fn test_for_entity() {
        let connections = Connections::new()
            .with("default", "primary")
            .with("reporting", "analytics");

        let plain = EntityMeta::builder("Post").build().unwrap();
        let stat = EntityMeta::builder("Stat").db("reporting").build().unwrap();
        assert_eq!(*connections.for_entity(&plain).unwrap(), "primary");
        assert_eq!(*connections.for_entity(&stat).unwrap(), "analytics");
        assert_eq!(connections.names().collect::<Vec<_>>(), vec!["default", "reporting"]);
    }

    #[test]
    fn test_unknown_connection() {
        let connections: Connections<&str> = Connections::new().with("default", "primary");
        let archive = EntityMeta::builder("Old").db("archive").build().unwrap();

        let err = connections.for_entity(&archive).unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(err.to_string(), "unknown connection: archive");
    }
}
