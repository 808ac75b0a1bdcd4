//! Entity metadata registry.
//!
//! Entity descriptors are registered once, typically at startup, and are
//! read-only afterwards. The registry is the [`MetadataReader`] the mapping
//! layer consumes.

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use crate::entity::EntityMeta;
use crate::error::{SchemaError, SchemaResult};
use crate::types::FieldType;

/// Read access to entity metadata.
pub trait MetadataReader: Send + Sync {
    /// Get the metadata for an entity class.
    fn entity(&self, name: &str) -> SchemaResult<Arc<EntityMeta>>;

    /// Resolve a type name from metadata.
    ///
    /// Builtin names win; anything else is looked up as a registered entity
    /// and becomes an embedded document type. `T[]` declares a list.
    fn resolve_type(&self, name: &str) -> Option<FieldType> {
        let name = name.trim();
        if let Some(inner) = name.strip_suffix("[]") {
            return self
                .resolve_type(inner)
                .map(|t| FieldType::List(Box::new(t)));
        }

        FieldType::parse(name).or_else(|| {
            let class = name.trim_start_matches('\\');
            self.entity(class).ok().map(FieldType::Embedded)
        })
    }
}

/// A registry of entity descriptors keyed by class name.
#[derive(Debug, Default)]
pub struct Registry {
    entities: RwLock<IndexMap<SmolStr, Arc<EntityMeta>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        static INSTANCE: OnceLock<Registry> = OnceLock::new();
        INSTANCE.get_or_init(Registry::new)
    }

    /// Register an entity descriptor.
    ///
    /// Registering the same class name twice is an error.
    pub fn register(&self, meta: EntityMeta) -> SchemaResult<Arc<EntityMeta>> {
        let mut entities = self.entities.write();
        if entities.contains_key(meta.name()) {
            return Err(SchemaError::duplicate("entity", meta.name()));
        }

        debug!(
            entity = %meta.name(),
            properties = meta.property_count(),
            "Registered entity metadata"
        );

        let meta = Arc::new(meta);
        entities.insert(SmolStr::new(meta.name()), Arc::clone(&meta));
        Ok(meta)
    }

    /// Check if an entity class is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entities.read().contains_key(name)
    }

    /// Names of all registered entity classes, in registration order.
    pub fn names(&self) -> Vec<SmolStr> {
        self.entities.read().keys().cloned().collect()
    }

    /// Number of registered entity classes.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl MetadataReader for Registry {
    fn entity(&self, name: &str) -> SchemaResult<Arc<EntityMeta>> {
        self.entities
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::unknown_entity(name))
    }
}
