//! # docmap-mongodb
//!
//! Object-document mapping between application entities and MongoDB documents.
//!
//! This crate provides:
//! - Casting of values to the types declared in entity metadata, with
//!   recoverable diagnostics instead of hard failures
//! - Field maps between database field names and property names
//! - The [`Translator`]: write-side casting (`@dbSkip`, `@dbFieldType`,
//!   filter directives), read-side materialization and filter translation
//! - Collection and connection name resolution
//! - Async document stores over the MongoDB driver or in memory
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use docmap_mongodb::prelude::*;
//! use docmap_schema::{EntityMeta, FieldType, PropertyMeta};
//!
//! let post = Arc::new(
//!     EntityMeta::builder("App\\BlogPost")
//!         .property(PropertyMeta::new("id").id().db_field_type(FieldType::ObjectId))
//!         .property(PropertyMeta::new("views").db_field_type(FieldType::Int32))
//!         .property(PropertyMeta::new("preview").db_skip())
//!         .build()?,
//! );
//!
//! let translator = Translator::new();
//! assert_eq!(translator.collection_name(&post), "blog_posts");
//!
//! let data = doc! { "id": "5949fe7259049b03f8b7821c", "views(inc)": "1", "preview": "..." };
//! let casted = translator.cast_for_db(data, &post)?;
//! assert!(casted.is_clean());
//! assert_eq!(casted.value.get_i32("views(inc)")?, 1);
//! assert!(!casted.value.contains_key("preview"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod caster;
pub mod client;
pub mod collection;
pub mod config;
pub mod connections;
pub mod document;
pub mod entity;
pub mod error;
pub mod field_map;
pub mod logging;
pub mod store;
pub mod translator;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use caster::{CastDiagnostic, Casted, DiagnosticKind, ValueCaster};
pub use client::{MongoClient, MongoClientBuilder};
pub use collection::EntityCollection;
pub use config::{MongoConfig, MongoConfigBuilder, ReadPreference};
pub use connections::{Connections, connection_name};
pub use entity::{Assignable, Castable, Entity, Identifiable, Record, SerializeFilter};
pub use error::{MongoError, MongoResult};
pub use field_map::{FieldMap, id_property};
pub use store::{DocumentStore, FindOptions, MemoryStore, MongoStore, ReplaceOutcome};
pub use translator::Translator;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::caster::{CastDiagnostic, Casted, ValueCaster};
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::collection::EntityCollection;
    pub use crate::connections::Connections;
    pub use crate::entity::{Assignable, Castable, Entity, Identifiable, Record, SerializeFilter};
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::store::{DocumentStore, FindOptions, MemoryStore, MongoStore};
    pub use crate::translator::Translator;
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
