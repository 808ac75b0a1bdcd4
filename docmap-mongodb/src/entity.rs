//! Entities and the capabilities the mapping layer needs from them.
//!
//! [`Entity`] is the base: a property bag bound to its class metadata. The
//! narrow capabilities ([`Assignable`], [`Castable`], [`Identifiable`],
//! [`SerializeFilter`]) are blanket-implemented on top of it, and the
//! translator only asks for the ones it uses.

use std::sync::Arc;

use bson::{Bson, Document};
use docmap_schema::EntityMeta;
use serde::{Serialize, de::DeserializeOwned};
use smol_str::SmolStr;

use crate::caster::{Casted, ValueCaster};
use crate::document;
use crate::error::MongoResult;
use crate::field_map;

/// An application object with named properties.
pub trait Entity {
    /// Metadata of the entity class.
    fn meta(&self) -> &EntityMeta;

    /// Current value of a property, if set.
    fn get(&self, property: &str) -> Option<Bson>;

    /// Set a property value without any casting.
    fn set(&mut self, property: &str, value: Bson);

    /// Remove a property value.
    fn unset(&mut self, property: &str) -> Option<Bson>;

    /// All set properties, in order.
    fn values(&self) -> Document;
}

/// Plain property assignment.
pub trait Assignable: Entity {
    /// Assign every value as is.
    fn assign(&mut self, values: Document) {
        for (property, value) in values {
            self.set(&property, value);
        }
    }
}

impl<E: Entity + ?Sized> Assignable for E {}

/// Casting of all properties to their declared types.
pub trait Castable: Entity {
    /// Re-cast every set property that declares a type.
    ///
    /// Properties that are not set are left alone. Uncastable values are kept
    /// and reported.
    fn cast(&mut self, caster: &ValueCaster) -> Casted<()> {
        let mut result = Casted::ok(());

        let typed: Vec<_> = self
            .meta()
            .properties()
            .filter_map(|p| p.value_type().map(|ty| (p.name.clone(), ty.clone())))
            .collect();

        for (property, ty) in typed {
            let Some(value) = self.get(&property) else {
                continue;
            };
            let casted = caster.cast(value, &ty);
            result
                .diagnostics
                .extend(casted.diagnostics.into_iter().map(|d| d.at(&property)));
            self.set(&property, casted.value);
        }

        result
    }
}

impl<E: Entity + ?Sized> Castable for E {}

/// Access to the identifier.
pub trait Identifiable: Entity {
    /// Name of the identifier property.
    fn id_property(&self) -> SmolStr {
        field_map::id_property(self.meta())
    }

    /// Current identifier value, ignoring `null`.
    fn id(&self) -> Option<Bson> {
        self.get(&self.id_property())
            .filter(|id| !matches!(id, Bson::Null))
    }

    /// Set the identifier value.
    fn set_id(&mut self, id: Bson) {
        let property = self.id_property();
        self.set(&property, id);
    }
}

impl<E: Entity + ?Sized> Identifiable for E {}

/// Projection used when an entity is exposed outside the application.
pub trait SerializeFilter: Entity {
    /// All set properties except those flagged `@ignore`.
    ///
    /// Properties the class does not declare are kept.
    fn filter_for_serialization(&self) -> Document {
        let meta = self.meta();
        self.values()
            .into_iter()
            .filter(|(property, _)| !meta.get_property(property).is_some_and(|p| p.ignore))
            .collect()
    }
}

impl<E: Entity + ?Sized> SerializeFilter for E {}

/// A document-backed entity.
///
/// This is what the translator materializes query results into. Values are
/// kept in assignment order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    meta: Arc<EntityMeta>,
    values: Document,
}

impl Record {
    /// Create an empty record.
    pub fn new(meta: Arc<EntityMeta>) -> Self {
        Self {
            meta,
            values: Document::new(),
        }
    }

    /// Create a record holding the given values as is.
    pub fn with_values(meta: Arc<EntityMeta>, values: Document) -> Self {
        Self { meta, values }
    }

    /// Create a record from any serializable value.
    pub fn from_typed<T: Serialize>(meta: Arc<EntityMeta>, value: &T) -> MongoResult<Self> {
        Ok(Self::with_values(meta, document::to_document(value)?))
    }

    /// Deserialize the record values into a typed struct.
    pub fn to_typed<T: DeserializeOwned>(&self) -> MongoResult<T> {
        document::from_document(self.values.clone())
    }

    /// Shared handle to the class metadata.
    pub fn meta_arc(&self) -> &Arc<EntityMeta> {
        &self.meta
    }

    /// Borrow the values.
    pub fn as_document(&self) -> &Document {
        &self.values
    }

    /// Take the values.
    pub fn into_document(self) -> Document {
        self.values
    }
}

impl Entity for Record {
    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn get(&self, property: &str) -> Option<Bson> {
        self.values.get(property).cloned()
    }

    fn set(&mut self, property: &str, value: Bson) {
        self.values.insert(property, value);
    }

    fn unset(&mut self, property: &str) -> Option<Bson> {
        self.values.remove(property)
    }

    fn values(&self) -> Document {
        self.values.clone()
    }
}
