//! Declared value types for entity properties.

use std::fmt;
use std::sync::Arc;

use crate::entity::EntityMeta;

/// Type names that all denote the database's native identifier type.
const OBJECT_ID_NAMES: &[&str] = &[
    "objectid",
    "oid",
    "mongoid",
    "mongodb\\bson\\objectid",
    "bson::oid::objectid",
    "mongodb::bson::oid::objectid",
];

/// The type a property value is cast to.
///
/// Type names from metadata are resolved into a `FieldType` once, when the
/// entity is registered. Casting code only ever matches on the resolved tag.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// The database's native 12-byte identifier.
    ObjectId,
    /// UTF-8 string.
    String,
    /// 32-bit integer.
    Int32,
    /// 64-bit integer.
    Int64,
    /// Double precision float.
    Double,
    /// Boolean.
    Bool,
    /// UTC date-time.
    DateTime,
    /// UUID stored as binary subtype 4.
    Uuid,
    /// Untyped embedded document.
    Document,
    /// Untyped array.
    Array,
    /// Embedded document described by another entity.
    Embedded(Arc<EntityMeta>),
    /// Homogeneous list of values.
    List(Box<FieldType>),
}

impl FieldType {
    /// Resolve a builtin type name.
    ///
    /// Matching is case-insensitive and ignores a leading namespace separator,
    /// so `\MongoDB\BSON\ObjectId`, `MongoDB\BSON\ObjectId` and
    /// `mongodb\bson\objectid` all resolve to [`FieldType::ObjectId`].
    /// A trailing `[]` declares a list of the inner type.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(inner) = name.strip_suffix("[]") {
            return Self::parse(inner).map(|t| Self::List(Box::new(t)));
        }

        let normalized = strip_namespace_root(name).to_lowercase();
        if Self::is_object_id_name(&normalized) {
            return Some(Self::ObjectId);
        }

        let ty = match normalized.as_str() {
            "string" | "str" => Self::String,
            "int" | "integer" | "i32" | "int32" => Self::Int32,
            "long" | "i64" | "int64" => Self::Int64,
            "float" | "double" | "f64" => Self::Double,
            "bool" | "boolean" => Self::Bool,
            "datetime" | "datetimeinterface" | "date" | "mongodb\\bson\\utcdatetime" => {
                Self::DateTime
            }
            "uuid" => Self::Uuid,
            "object" | "stdclass" | "document" => Self::Document,
            "array" => Self::Array,
            _ => return None,
        };
        Some(ty)
    }

    /// Check whether a normalized type name denotes the identifier type.
    fn is_object_id_name(normalized: &str) -> bool {
        OBJECT_ID_NAMES.contains(&normalized)
    }

    /// Check if this is the database's identifier type.
    pub fn is_object_id(&self) -> bool {
        matches!(self, Self::ObjectId)
    }

    /// Get the embedded entity descriptor, if any.
    pub fn embedded(&self) -> Option<&Arc<EntityMeta>> {
        match self {
            Self::Embedded(meta) => Some(meta),
            _ => None,
        }
    }

    /// Human readable name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Self::ObjectId => "ObjectId".to_string(),
            Self::String => "string".to_string(),
            Self::Int32 => "int".to_string(),
            Self::Int64 => "long".to_string(),
            Self::Double => "double".to_string(),
            Self::Bool => "bool".to_string(),
            Self::DateTime => "DateTime".to_string(),
            Self::Uuid => "uuid".to_string(),
            Self::Document => "object".to_string(),
            Self::Array => "array".to_string(),
            Self::Embedded(meta) => meta.name().to_string(),
            Self::List(inner) => format!("{}[]", inner.name()),
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Embedded(a), Self::Embedded(b)) => a.name() == b.name(),
            (Self::List(a), Self::List(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Remove a leading `\` or `::` from a qualified type name.
fn strip_namespace_root(name: &str) -> &str {
    name.trim_start_matches('\\').trim_start_matches("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_spellings() {
        for name in [
            "MongoDB\\BSON\\ObjectId",
            "\\MongoDB\\BSON\\ObjectId",
            "mongodb\\bson\\objectid",
            "MongoId",
            "\\MongoId",
            "bson::oid::ObjectId",
            "::bson::oid::ObjectId",
            "ObjectId",
        ] {
            assert_eq!(FieldType::parse(name), Some(FieldType::ObjectId), "{name}");
        }
    }

    #[test]
    fn test_scalar_names() {
        assert_eq!(FieldType::parse("int"), Some(FieldType::Int32));
        assert_eq!(FieldType::parse("Integer"), Some(FieldType::Int32));
        assert_eq!(FieldType::parse("boolean"), Some(FieldType::Bool));
        assert_eq!(FieldType::parse("\\DateTime"), Some(FieldType::DateTime));
        assert_eq!(FieldType::parse("float"), Some(FieldType::Double));
        assert_eq!(FieldType::parse("Money"), None);
    }

    #[test]
    fn test_list_suffix() {
        assert_eq!(
            FieldType::parse("MongoId[]"),
            Some(FieldType::List(Box::new(FieldType::ObjectId)))
        );
        assert_eq!(FieldType::parse("Money[]"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FieldType::ObjectId.to_string(), "ObjectId");
        assert_eq!(
            FieldType::List(Box::new(FieldType::Int32)).to_string(),
            "int[]"
        );
    }
}
