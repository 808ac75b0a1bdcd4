//! BSON document helpers shared by the caster, translator and stores.

use bson::{Bson, Document, oid::ObjectId};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{MongoError, MongoResult};

/// The reserved identifier field of every document.
pub const ID_FIELD: &str = "_id";

/// Convert a struct to a BSON document.
pub fn to_document<T: Serialize>(value: &T) -> MongoResult<Document> {
    bson::to_document(value).map_err(|e| MongoError::serialization(e.to_string()))
}

/// Convert a BSON document to a struct.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> MongoResult<T> {
    bson::from_document(doc).map_err(|e| MongoError::serialization(e.to_string()))
}

/// Parse an ObjectId from a string.
pub fn parse_object_id(s: &str) -> MongoResult<ObjectId> {
    ObjectId::parse_str(s).map_err(MongoError::from)
}

/// Check if a string has the shape of an ObjectId: exactly 24 hex digits.
pub fn is_object_id_hex(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Short name of a value's BSON type, used in diagnostics.
pub fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::DateTime(_) => "date",
        Bson::Binary(b) if b.subtype == bson::spec::BinarySubtype::Uuid => "uuid",
        Bson::Binary(_) => "binData",
        Bson::ObjectId(_) => "objectId",
        Bson::Decimal128(_) => "decimal",
        Bson::Timestamp(_) => "timestamp",
        Bson::RegularExpression(_) => "regex",
        _ => "unknown",
    }
}

/// Assign a store-generated identifier to a raw document.
///
/// The id is written to `field`, moved to the front of the document so it
/// reads like what the server returns.
pub fn use_result_id(doc: &mut Document, field: &str, id: Bson) {
    let rest = std::mem::take(doc);
    doc.insert(field, id);
    for (key, value) in rest {
        if key != field {
            doc.insert(key, value);
        }
    }
}

/// Assign store-generated identifiers to raw documents, in order.
pub fn use_result_ids(docs: &mut [Document], field: &str, ids: Vec<Bson>) {
    for (doc, id) in docs.iter_mut().zip(ids) {
        use_result_id(doc, field, id);
    }
}

/// BSON type helpers.
pub mod bson_types {
    use super::*;
    use uuid::Uuid;

    /// Convert a UUID to BSON Binary.
    pub fn uuid_to_bson(uuid: Uuid) -> Bson {
        Bson::Binary(bson::Binary {
            subtype: bson::spec::BinarySubtype::Uuid,
            bytes: uuid.as_bytes().to_vec(),
        })
    }

    /// Convert BSON Binary or a UUID string to a UUID.
    pub fn bson_to_uuid(bson: &Bson) -> MongoResult<Uuid> {
        match bson {
            Bson::Binary(binary) => {
                let bytes: [u8; 16] = binary
                    .bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| MongoError::serialization("invalid UUID bytes"))?;
                Ok(Uuid::from_bytes(bytes))
            }
            Bson::String(s) => Uuid::parse_str(s)
                .map_err(|e| MongoError::serialization(format!("invalid UUID string: {}", e))),
            _ => Err(MongoError::serialization(
                "expected Binary or String for UUID",
            )),
        }
    }

    /// Parse an RFC 3339 string into a BSON DateTime.
    pub fn parse_datetime(s: &str) -> MongoResult<bson::DateTime> {
        chrono::DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| bson::DateTime::from_chrono(dt.with_timezone(&chrono::Utc)))
            .map_err(|e| MongoError::serialization(format!("invalid date-time: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn test_to_and_from_document() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct User {
            name: String,
            age: i32,
        }

        let doc = to_document(&User {
            name: "Bob".to_string(),
            age: 25,
        })
        .unwrap();
        assert_eq!(doc, doc! { "name": "Bob", "age": 25 });

        let user: User = from_document(doc).unwrap();
        assert_eq!(user.name, "Bob");
    }

    #[test]
    fn test_is_object_id_hex() {
        assert!(is_object_id_hex("5949fe7259049b03f8b7821c"));
        assert!(is_object_id_hex("5949FE7259049B03F8B7821C"));
        assert!(!is_object_id_hex("5949fe7259049b03f8b7821"));
        assert!(!is_object_id_hex("5949fe7259049b03f8b7821g"));
        assert!(!is_object_id_hex("foo"));
    }

    #[test]
    fn test_use_result_id_moves_id_first() {
        let oid = ObjectId::new();
        let mut doc = doc! { "foo": "bar" };
        use_result_id(&mut doc, ID_FIELD, Bson::ObjectId(oid));
        assert_eq!(doc, doc! { "_id": oid, "foo": "bar" });
        assert_eq!(doc.keys().next().map(String::as_str), Some("_id"));
    }

    #[test]
    fn test_use_result_id_replaces_existing() {
        let old = ObjectId::new();
        let new = ObjectId::new();
        let mut doc = doc! { "foo": "bar", "_id": old };
        use_result_id(&mut doc, ID_FIELD, Bson::ObjectId(new));
        assert_eq!(doc.get_object_id("_id").unwrap(), new);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_use_result_ids() {
        let ids = vec![Bson::ObjectId(ObjectId::new()), Bson::ObjectId(ObjectId::new())];
        let mut docs = vec![doc! { "foo": "bar" }, doc! { "baz": "zoo" }];
        use_result_ids(&mut docs, ID_FIELD, ids.clone());
        assert_eq!(docs[0].get("_id"), Some(&ids[0]));
        assert_eq!(docs[1].get("_id"), Some(&ids[1]));
    }

    #[test]
    fn test_uuid_conversion() {
        use bson_types::*;

        let uuid = Uuid::new_v4();
        let parsed = bson_to_uuid(&uuid_to_bson(uuid)).unwrap();
        assert_eq!(uuid, parsed);
    }

    #[test]
    fn test_parse_datetime() {
        let dt = bson_types::parse_datetime("2017-08-15T15:52:01+00:00").unwrap();
        assert_eq!(dt.timestamp_millis(), 1_502_812_321_000);
        assert!(bson_types::parse_datetime("yesterday").is_err());
    }
}
