//! Entity-class metadata: the descriptor table for one entity type.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::attribute::parse_annotations;
use crate::error::{SchemaError, SchemaResult};
use crate::property::PropertyMeta;
use crate::types::FieldType;

/// Metadata for an entity class.
///
/// Built once at registration and read-only afterwards. Properties keep
/// their declaration order, which decides identifier resolution when several
/// properties are flagged `@id`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMeta {
    name: SmolStr,
    collection: Option<SmolStr>,
    db: Option<SmolStr>,
    db_collection: Option<SmolStr>,
    properties: IndexMap<SmolStr, PropertyMeta>,
    extra: IndexMap<SmolStr, Option<String>>,
}

impl EntityMeta {
    /// Start building metadata for the named entity class.
    pub fn builder(name: impl Into<SmolStr>) -> EntityMetaBuilder {
        EntityMetaBuilder::new(name)
    }

    /// Fully qualified class name as registered (e.g. `App\Blog\BlogPost`).
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Class name with any namespace (`\` or `::` separated) removed.
    pub fn short_name(&self) -> &str {
        let name = self.name.as_str();
        let after_backslash = name.rsplit('\\').next().unwrap_or(name);
        after_backslash
            .rsplit("::")
            .next()
            .unwrap_or(after_backslash)
    }

    /// Explicit collection name set on the class itself.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Collection name from the `@dbCollection` annotation.
    pub fn db_collection(&self) -> Option<&str> {
        self.db_collection.as_deref()
    }

    /// Connection name from the `@db` annotation.
    pub fn db(&self) -> Option<&str> {
        self.db.as_deref()
    }

    /// All declared properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.properties.values()
    }

    /// Number of declared properties.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Metadata for a declared property.
    ///
    /// Asking for a property the class does not declare is an error: it means
    /// a stored key and the entity schema disagree.
    pub fn property(&self, name: &str) -> SchemaResult<&PropertyMeta> {
        self.properties
            .get(name)
            .ok_or_else(|| SchemaError::undeclared_property(self.name.as_str(), name))
    }

    /// Metadata for a property, or `None` if it is not declared.
    pub fn get_property(&self, name: &str) -> Option<&PropertyMeta> {
        self.properties.get(name)
    }

    /// Check if the class declares a property.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Class-level annotations without a dedicated meaning.
    pub fn extra(&self) -> &IndexMap<SmolStr, Option<String>> {
        &self.extra
    }
}

/// Builder for [`EntityMeta`].
#[derive(Debug)]
pub struct EntityMetaBuilder {
    name: SmolStr,
    collection: Option<SmolStr>,
    db: Option<SmolStr>,
    db_collection: Option<SmolStr>,
    properties: IndexMap<SmolStr, PropertyMeta>,
    extra: IndexMap<SmolStr, Option<String>>,
    errors: Vec<SchemaError>,
}

impl EntityMetaBuilder {
    /// Create a new builder.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            collection: None,
            db: None,
            db_collection: None,
            properties: IndexMap::new(),
            extra: IndexMap::new(),
            errors: Vec::new(),
        }
    }

    /// Set the explicit collection name, overriding every other source.
    pub fn collection(mut self, name: impl Into<SmolStr>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Set the `@dbCollection` annotation.
    pub fn db_collection(mut self, name: impl Into<SmolStr>) -> Self {
        self.db_collection = Some(name.into());
        self
    }

    /// Set the `@db` annotation (connection name).
    pub fn db(mut self, name: impl Into<SmolStr>) -> Self {
        self.db = Some(name.into());
        self
    }

    /// Apply class-level annotation tags (`@db`, `@dbCollection`).
    pub fn annotations(mut self, source: &str) -> Self {
        for tag in parse_annotations(source) {
            match (tag.name.as_str(), tag.value()) {
                ("db", Some(value)) => self.db = Some(SmolStr::new(value)),
                ("db", None) => self.db = None,
                ("dbCollection", Some(value)) => self.db_collection = Some(SmolStr::new(value)),
                ("dbCollection", None) => self
                    .errors
                    .push(SchemaError::invalid_annotation("dbCollection", "expected a value")),
                _ => {
                    self.extra.insert(tag.name.clone(), tag.value);
                }
            }
        }
        self
    }

    /// Declare a property.
    pub fn property(mut self, meta: PropertyMeta) -> Self {
        if self.properties.contains_key(&meta.name) {
            self.errors.push(SchemaError::duplicate(
                "property",
                format!("{}.{}", self.name, meta.name),
            ));
        } else {
            self.properties.insert(meta.name.clone(), meta);
        }
        self
    }

    /// Declare a property from annotation tags, resolving builtin types.
    pub fn annotated(self, name: &str, source: &str) -> Self {
        self.annotated_with(name, source, &FieldType::parse)
    }

    /// Declare a property from annotation tags with a custom type resolver.
    pub fn annotated_with(
        mut self,
        name: &str,
        source: &str,
        resolve: &dyn Fn(&str) -> Option<FieldType>,
    ) -> Self {
        match PropertyMeta::from_annotations_with(&self.name, name, source, resolve) {
            Ok(meta) => self.property(meta),
            Err(e) => {
                self.errors.push(e);
                self
            }
        }
    }

    /// Build the metadata, failing on the first recorded error.
    pub fn build(mut self) -> SchemaResult<EntityMeta> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }

        Ok(EntityMeta {
            name: self.name,
            collection: self.collection,
            db: self.db,
            db_collection: self.db_collection,
            properties: self.properties,
            extra: self.extra,
        })
    }
}
