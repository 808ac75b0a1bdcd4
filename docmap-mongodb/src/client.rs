//! MongoDB client wrapper.

use std::sync::Arc;

use bson::{Document, doc};
use docmap_schema::EntityMeta;
use mongodb::{Client, Database};
use tracing::{debug, info};

use crate::collection::EntityCollection;
use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};
use crate::store::MongoStore;
use crate::translator::Translator;

/// A MongoDB client bound to one database.
///
/// The driver pools connections internally, so clones are cheap and share
/// the pool.
#[derive(Clone, Debug)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl MongoClient {
    /// Create a new client from configuration.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;
        let database = client.database(&config.database);

        info!(
            uri = %config.uri,
            database = %config.database,
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
        })
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// Document store over a collection of the database.
    pub fn store(&self, collection: &str) -> MongoStore {
        MongoStore::new(self.database.collection::<Document>(collection))
    }

    /// Entity collection for an entity class, named by its collection name.
    pub fn entity_collection(
        &self,
        meta: Arc<EntityMeta>,
        translator: Arc<Translator>,
    ) -> EntityCollection<MongoStore> {
        let name = translator.collection_name(&meta);
        debug!(entity = meta.name(), collection = %name, "binding entity collection");
        EntityCollection::new(meta, translator, self.store(&name))
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// The underlying driver client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// The configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Check if the server answers a ping.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }

    /// Drop a collection.
    pub async fn drop_collection(&self, name: &str) -> MongoResult<()> {
        debug!(collection = %name, "dropping collection");
        self.database
            .collection::<Document>(name)
            .drop(None)
            .await?;
        Ok(())
    }
}

/// Builder for [`MongoClient`].
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    direct_connection: Option<bool>,
}

impl MongoClientBuilder {
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

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Enable direct connection.
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the configuration without connecting.
    pub fn config(self) -> MongoResult<MongoConfig> {
        let mut builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            builder = builder.uri(uri);
        }
        if let Some(database) = self.database {
            builder = builder.database(database);
        }
        if let Some(app_name) = self.app_name {
            builder = builder.app_name(app_name);
        }
        if let Some(size) = self.max_pool_size {
            builder = builder.max_pool_size(size);
        }
        if let Some(direct) = self.direct_connection {
            builder = builder.direct_connection(direct);
        }

        builder.build()
    }

    /// Build the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        MongoClient::new(self.config()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder_config() {
        let config = MongoClientBuilder::new()
            .uri("mongodb://localhost:27017")
            .database("blog")
            .max_pool_size(20)
            .config()
            .unwrap();

        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "blog");
        assert_eq!(config.max_pool_size, Some(20));
    }

    #[test]
    fn test_client_builder_requires_database() {
        assert!(MongoClientBuilder::new().config().is_err());
    }

    #[tokio::test]
    async fn test_entity_collection_is_named_by_class() {
        // Client creation does not touch the network until the first operation
        let client = MongoClient::builder()
            .uri("mongodb://localhost:27017")
            .database("blog")
            .build()
            .await
            .unwrap();

        let meta = Arc::new(EntityMeta::builder("App\\BlogPost").build().unwrap());
        let posts = client.entity_collection(meta, Arc::new(Translator::new()));
        assert_eq!(posts.name(), "blog_posts");
    }
}
