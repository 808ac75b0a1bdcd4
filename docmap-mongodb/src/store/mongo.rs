//! Driver-backed document store.

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::options::{self, ReplaceOptions};
use tracing::debug;

use super::{DocumentStore, FindOptions, ReplaceOutcome};
use crate::error::{MongoError, MongoResult};

/// A [`DocumentStore`] over a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Wrap a driver collection.
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    /// The underlying driver collection.
    pub fn inner(&self) -> &Collection<Document> {
        &self.collection
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &str {
        self.collection.name()
    }

    async fn insert_one(&self, doc: Document) -> MongoResult<Bson> {
        debug!(collection = self.name(), "insert_one");
        let result = self.collection.insert_one(doc, None).await?;
        Ok(result.inserted_id)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> MongoResult<Vec<Bson>> {
        let count = docs.len();
        debug!(collection = self.name(), count, "insert_many");
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = self.collection.insert_many(docs, None).await?;
        (0..count)
            .map(|index| {
                result
                    .inserted_ids
                    .remove(&index)
                    .ok_or_else(|| MongoError::internal(format!("no id returned for document {}", index)))
            })
            .collect()
    }

    async fn replace_one(
        &self,
        filter: Document,
        doc: Document,
        upsert: bool,
    ) -> MongoResult<ReplaceOutcome> {
        debug!(collection = self.name(), filter = %filter, upsert, "replace_one");
        let mut opts = ReplaceOptions::default();
        opts.upsert = Some(upsert);

        let result = self.collection.replace_one(filter, doc, opts).await?;
        Ok(ReplaceOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Document>> {
        debug!(collection = self.name(), filter = %filter, "find");
        let mut opts = options::FindOptions::default();
        opts.sort = options.sort;
        opts.limit = options.limit;
        opts.skip = options.skip;

        let cursor = self.collection.find(filter, opts).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn find_one(&self, filter: Document) -> MongoResult<Option<Document>> {
        debug!(collection = self.name(), filter = %filter, "find_one");
        Ok(self.collection.find_one(filter, None).await?)
    }

    async fn count(&self, filter: Document) -> MongoResult<u64> {
        debug!(collection = self.name(), filter = %filter, "count");
        Ok(self.collection.count_documents(filter, None).await?)
    }

    async fn delete_many(&self, filter: Document) -> MongoResult<u64> {
        debug!(collection = self.name(), filter = %filter, "delete_many");
        let result = self.collection.delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }
}
