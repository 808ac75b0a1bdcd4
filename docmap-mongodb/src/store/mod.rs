//! Document stores: where translated documents are read from and written to.
//!
//! [`DocumentStore`] is the narrow interface the mapping layer consumes. It is
//! implemented by [`MongoStore`] over a driver collection and by
//! [`MemoryStore`], an in-process collection for tests and local development.

mod memory;
mod mongo;

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::error::MongoResult;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Options for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort document, `{ field: 1 | -1, ... }`.
    pub sort: Option<Document>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
}

impl FindOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sort document.
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of documents to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Outcome of [`DocumentStore::replace_one`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaceOutcome {
    /// Number of documents matched by the filter.
    pub matched: u64,
    /// Number of documents actually changed.
    pub modified: u64,
    /// Identifier of the inserted document, when the replace upserted.
    pub upserted_id: Option<Bson>,
}

/// A collection of raw BSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the collection.
    fn name(&self) -> &str;

    /// Insert a document and return its identifier.
    ///
    /// A document without `_id` gets a generated one.
    async fn insert_one(&self, doc: Document) -> MongoResult<Bson>;

    /// Insert documents and return their identifiers in input order.
    async fn insert_many(&self, docs: Vec<Document>) -> MongoResult<Vec<Bson>>;

    /// Replace the first document matching the filter.
    async fn replace_one(
        &self,
        filter: Document,
        doc: Document,
        upsert: bool,
    ) -> MongoResult<ReplaceOutcome>;

    /// Find documents matching the filter.
    async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Document>>;

    /// Find the first document matching the filter.
    async fn find_one(&self, filter: Document) -> MongoResult<Option<Document>> {
        let docs = self.find(filter, FindOptions::new().limit(1)).await?;
        Ok(docs.into_iter().next())
    }

    /// Count documents matching the filter.
    async fn count(&self, filter: Document) -> MongoResult<u64>;

    /// Delete every document matching the filter and return how many went.
    async fn delete_many(&self, filter: Document) -> MongoResult<u64>;
}
