//! # docmap
//!
//! Object-document mapping between typed application entities and MongoDB
//! collections.
//!
//! docmap provides:
//! - Statically registered entity metadata (`@id`, `@dbFieldName`,
//!   `@dbFieldType`, `@dbSkip`, `@ignore`, `@db`, `@dbCollection`)
//! - Per-property value casting with recoverable diagnostics
//! - Translation of entities to documents and back, including field renames
//!   and query filters
//! - Collection and connection name resolution
//! - Async document stores over the MongoDB driver or in memory
//!
//! ## Quick Start
//!
//! ```rust
//! use docmap::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new();
//! let post = registry.register(
//!     EntityMeta::builder("App\\BlogPost")
//!         .annotated("id", "@id @dbFieldType \\MongoDB\\BSON\\ObjectId")
//!         .annotated("authorId", "@dbFieldName author_id @dbFieldType MongoId")
//!         .annotated("title", "@var string")
//!         .build()?,
//! )?;
//!
//! let translator = Arc::new(Translator::new());
//! let posts = EntityCollection::new(
//!     post.clone(),
//!     translator.clone(),
//!     MemoryStore::new(translator.collection_name(&post)),
//! );
//!
//! let mut draft = posts.record();
//! draft.set("authorId", "5949fe7259049b03f8b7821c".into());
//! draft.set("title", "Hello".into());
//! let id = posts.insert(&mut draft).await?;
//!
//! let stored = posts.find_by_id(id).await?.expect("inserted");
//! assert_eq!(stored.get("title"), Some(Bson::String("Hello".into())));
//! assert_eq!(posts.name(), "blog_posts");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Entity metadata and configuration.
pub mod schema {
    pub use docmap_schema::*;
}

/// Translation, casting and document stores.
pub mod mongodb {
    pub use docmap_mongodb::*;
}

pub use docmap_mongodb::logging;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::mongodb::prelude::*;
    pub use crate::schema::{
        DocmapConfig, EntityMeta, FieldType, MetadataReader, PropertyMeta, Registry,
    };
    pub use std::sync::Arc;
}

// Re-export key types at the crate root
pub use docmap_mongodb::{MongoError, MongoResult, Translator};
pub use docmap_schema::{SchemaError, SchemaResult};
