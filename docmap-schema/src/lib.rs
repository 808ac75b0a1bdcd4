//! # docmap-schema
//!
//! Entity metadata for the docmap object-document mapper.
//!
//! This crate provides:
//! - Statically registered descriptor tables for entity classes
//! - Per-property metadata (`@id`, `@dbFieldName`, `@dbFieldType`, `@dbSkip`, `@ignore`)
//! - Resolution of type names into [`FieldType`] tags at registration time
//! - Configuration parser for `docmap.toml` files
//!
//! ## Example
//!
//! ```rust
//! use docmap_schema::{EntityMeta, FieldType, PropertyMeta, Registry, MetadataReader};
//!
//! let registry = Registry::new();
//! registry.register(
//!     EntityMeta::builder("App\\BlogPost")
//!         .property(PropertyMeta::new("id").id().db_field_type(FieldType::ObjectId))
//!         .annotated("authorId", "@dbFieldName author_id @dbFieldType MongoId")
//!         .property(PropertyMeta::new("title"))
//!         .build()?,
//! )?;
//!
//! let post = registry.entity("App\\BlogPost")?;
//! assert_eq!(post.property("authorId")?.field_name(), "author_id");
//! # Ok::<(), docmap_schema::SchemaError>(())
//! ```

pub mod attribute;
pub mod config;
pub mod entity;
pub mod error;
pub mod property;
pub mod registry;
pub mod types;

pub use attribute::{Annotation, parse_annotations};
pub use config::{CastingConfig, ConnectionConfig, DEFAULT_CONNECTION, DocmapConfig};
pub use entity::{EntityMeta, EntityMetaBuilder};
pub use error::{SchemaError, SchemaResult};
pub use property::PropertyMeta;
pub use registry::{MetadataReader, Registry};
pub use types::FieldType;
