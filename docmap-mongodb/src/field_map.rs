//! Mapping between database field names and entity property names.

use docmap_schema::EntityMeta;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::document::ID_FIELD;

/// Property used as identifier when no property is flagged `@id`.
pub const DEFAULT_ID_PROPERTY: &str = "id";

/// Resolve the identifier property of an entity class.
///
/// Returns the first property flagged `@id` in declaration order, or `id`
/// when none is flagged. The returned property is not guaranteed to exist.
pub fn id_property(meta: &EntityMeta) -> SmolStr {
    meta.properties()
        .find(|p| p.is_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| SmolStr::new_static(DEFAULT_ID_PROPERTY))
}

/// Sparse map from database field name to property name.
///
/// Always holds `_id`. Other entries exist only for renamed properties;
/// a field that is not listed has the same name as its property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    entries: IndexMap<SmolStr, SmolStr>,
}

impl FieldMap {
    /// Build the field map of an entity class.
    pub fn build(meta: &EntityMeta) -> Self {
        let id = id_property(meta);
        let mut entries = IndexMap::new();
        entries.insert(SmolStr::new_static(ID_FIELD), id.clone());

        for prop in meta.properties() {
            if prop.name == id || !prop.is_renamed() {
                continue;
            }
            let field = SmolStr::new(prop.field_name());
            // `_id` stays bound to the identifier property
            if field == ID_FIELD {
                continue;
            }
            entries.insert(field, prop.name.clone());
        }

        Self { entries }
    }

    /// The identifier property (`_id` target).
    pub fn id_property(&self) -> &str {
        self.entries
            .get(ID_FIELD)
            .map(SmolStr::as_str)
            .unwrap_or(DEFAULT_ID_PROPERTY)
    }

    /// Explicit entry for a database field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries.get(field).map(SmolStr::as_str)
    }

    /// Property name for a database field, falling back to the field name.
    pub fn property_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.get(field).unwrap_or(field)
    }

    /// Database field for a property, falling back to the property name.
    pub fn field_for<'a>(&'a self, property: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(_, prop)| prop.as_str() == property)
            .map(|(field, _)| field.as_str())
            .unwrap_or(property)
    }

    /// Check if the map has an explicit entry for a field.
    pub fn contains_field(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Iterate over `(field, property)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, p)| (f.as_str(), p.as_str()))
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: `_id` is always mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
