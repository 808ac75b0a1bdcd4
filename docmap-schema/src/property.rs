//! Per-property metadata.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::attribute::parse_annotations;
use crate::error::{SchemaError, SchemaResult};
use crate::types::FieldType;

/// Metadata for a single entity property.
///
/// `db_skip` and `ignore` are independent: the first drops the property on the
/// write path, the second hides it from serialized views.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMeta {
    /// Property name on the entity.
    pub name: SmolStr,
    /// This property is the entity identifier.
    pub is_id: bool,
    /// Database field name, if it differs from the property name.
    pub db_field_name: Option<SmolStr>,
    /// Type the value is cast to before it is written.
    pub db_field_type: Option<FieldType>,
    /// Declared value type of the property itself.
    pub var: Option<FieldType>,
    /// Never persist this property.
    pub db_skip: bool,
    /// Omit this property from serialized views.
    pub ignore: bool,
    /// Annotations without a dedicated meaning.
    pub extra: IndexMap<SmolStr, Option<String>>,
}

impl PropertyMeta {
    /// Create metadata for a property with no annotations.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            is_id: false,
            db_field_name: None,
            db_field_type: None,
            var: None,
            db_skip: false,
            ignore: false,
            extra: IndexMap::new(),
        }
    }

    /// Parse property metadata from annotation tags, resolving builtin types only.
    pub fn from_annotations(entity: &str, name: &str, source: &str) -> SchemaResult<Self> {
        Self::from_annotations_with(entity, name, source, &FieldType::parse)
    }

    /// Parse property metadata from annotation tags with a custom type resolver.
    ///
    /// Recognized tags are `@id`, `@var`, `@dbFieldName`, `@dbFieldType`,
    /// `@dbSkip` and `@ignore`. Other tags end up in [`PropertyMeta::extra`].
    pub fn from_annotations_with(
        entity: &str,
        name: &str,
        source: &str,
        resolve: &dyn Fn(&str) -> Option<FieldType>,
    ) -> SchemaResult<Self> {
        let mut meta = Self::new(name);

        for tag in parse_annotations(source) {
            match tag.name.as_str() {
                "id" => meta.is_id = true,
                "dbSkip" => meta.db_skip = true,
                "ignore" => meta.ignore = true,
                "dbFieldName" => {
                    let value = required_value(&tag.name, tag.value())?;
                    meta.db_field_name = Some(SmolStr::new(value));
                }
                "dbFieldType" | "var" => {
                    let value = required_value(&tag.name, tag.value())?;
                    // `@var string|null` style unions: the first member wins
                    let type_name = value.split(['|', ' ']).next().unwrap_or(value);
                    let ty = resolve(type_name)
                        .ok_or_else(|| SchemaError::unknown_type(entity, name, type_name))?;
                    if tag.is("var") {
                        meta.var = Some(ty);
                    } else {
                        meta.db_field_type = Some(ty);
                    }
                }
                _ => {
                    meta.extra.insert(tag.name.clone(), tag.value);
                }
            }
        }

        Ok(meta)
    }

    /// Mark this property as the identifier.
    pub fn id(mut self) -> Self {
        self.is_id = true;
        self
    }

    /// Store this property under a different database field name.
    pub fn db_field_name(mut self, field: impl Into<SmolStr>) -> Self {
        self.db_field_name = Some(field.into());
        self
    }

    /// Cast the value to this type before writing.
    pub fn db_field_type(mut self, ty: FieldType) -> Self {
        self.db_field_type = Some(ty);
        self
    }

    /// Declare the property's own value type.
    pub fn var(mut self, ty: FieldType) -> Self {
        self.var = Some(ty);
        self
    }

    /// Never persist this property.
    pub fn db_skip(mut self) -> Self {
        self.db_skip = true;
        self
    }

    /// Hide this property from serialized views.
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Get the property name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The database field this property is stored under.
    pub fn field_name(&self) -> &str {
        self.db_field_name.as_deref().unwrap_or(self.name.as_str())
    }

    /// Check if the database field name differs from the property name.
    pub fn is_renamed(&self) -> bool {
        self.db_field_name
            .as_ref()
            .is_some_and(|field| field != &self.name)
    }

    /// The type a value of this property is held as on the entity.
    ///
    /// Falls back to the database field type when no value type is declared.
    pub fn value_type(&self) -> Option<&FieldType> {
        self.var.as_ref().or(self.db_field_type.as_ref())
    }
}

fn required_value<'a>(name: &str, value: Option<&'a str>) -> SchemaResult<&'a str> {
    value.ok_or_else(|| SchemaError::invalid_annotation(name, "expected a value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let meta = PropertyMeta::new("userId")
            .db_field_name("user_id")
            .db_field_type(FieldType::ObjectId);

        assert_eq!(meta.field_name(), "user_id");
        assert!(meta.is_renamed());
        assert!(!meta.is_id);
        assert_eq!(meta.value_type(), Some(&FieldType::ObjectId));
    }

    #[test]
    fn test_rename_to_same_name_is_not_renamed() {
        let meta = PropertyMeta::new("email").db_field_name("email");
        assert!(!meta.is_renamed());
    }

    #[test]
    fn test_from_annotations() {
        let meta = PropertyMeta::from_annotations(
            "Post",
            "authorId",
            "@var string @dbFieldType \\MongoDB\\BSON\\ObjectId @dbFieldName author @searchable",
        )
        .unwrap();

        assert_eq!(meta.var, Some(FieldType::String));
        assert_eq!(meta.db_field_type, Some(FieldType::ObjectId));
        assert_eq!(meta.field_name(), "author");
        assert!(meta.extra.contains_key("searchable"));
        assert_eq!(meta.value_type(), Some(&FieldType::String));
    }

    #[test]
    fn test_from_annotations_union_type() {
        let meta = PropertyMeta::from_annotations("Post", "views", "@var int|null").unwrap();
        assert_eq!(meta.var, Some(FieldType::Int32));
    }

    #[test]
    fn test_from_annotations_unknown_type() {
        let err = PropertyMeta::from_annotations("Post", "price", "@dbFieldType Money").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { .. }));
    }

    #[test]
    fn test_from_annotations_missing_value() {
        let err = PropertyMeta::from_annotations("Post", "slug", "@dbFieldName").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAnnotation { .. }));
    }

    #[test]
    fn test_skip_and_ignore_are_independent() {
        let meta = PropertyMeta::from_annotations("Post", "cache", "@dbSkip").unwrap();
        assert!(meta.db_skip);
        assert!(!meta.ignore);
    }
}
