//! Translation of entity data between the application model and BSON documents.
//!
//! The [`Translator`] applies per-property metadata on both paths:
//!
//! - **write**: [`Translator::cast_for_db`] drops `@dbSkip` properties and casts
//!   values to their `@dbFieldType`, [`Translator::to_document`] then renames
//!   properties to their database fields.
//! - **read**: [`Translator::from_document`] renames fields back to properties
//!   and [`Translator::set_values`] re-casts the whole entity.
//!
//! Every operation is a pure function of its inputs and the entity metadata.
//! Field maps are memoized per entity class.

use std::collections::HashMap;
use std::sync::Arc;

use bson::{Bson, Document};
use convert_case::{Case, Casing};
use docmap_schema::{CastingConfig, EntityMeta, FieldType, PropertyMeta, SchemaError};
use parking_lot::RwLock;
use smol_str::SmolStr;
use tracing::debug;

use crate::caster::{Casted, ValueCaster};
use crate::connections;
use crate::document::ID_FIELD;
use crate::entity::{Assignable, Castable, Entity, Record, SerializeFilter};
use crate::error::MongoResult;
use crate::field_map::{self, FieldMap};

/// Operators whose value is a list of sub-filters.
const LOGICAL_OPERATORS: &[&str] = &["$and", "$or", "$nor"];

/// Operators whose value is compared against a single field value.
const VALUE_OPERATORS: &[&str] = &["$eq", "$ne", "$gt", "$gte", "$lt", "$lte"];

/// Operators whose value is a list of field values.
const LIST_OPERATORS: &[&str] = &["$in", "$nin", "$all"];

/// Strip a filter directive from a field key.
///
/// `"count(inc)"` resolves to `count`. A key without `(` is returned as is,
/// and so is a key that would be empty once stripped.
///
/// ```rust
/// use docmap_mongodb::translator::property_key;
///
/// assert_eq!(property_key("count(inc)"), "count");
/// assert_eq!(property_key("tags (push) "), "tags");
/// assert_eq!(property_key("name"), "name");
/// ```
pub fn property_key(field_key: &str) -> &str {
    match field_key.split_once('(') {
        Some((bare, _)) if !bare.trim().is_empty() => bare.trim(),
        _ => field_key,
    }
}

/// Derive the default collection name of a class: pluralized and tableized.
///
/// ```rust
/// use docmap_mongodb::translator::tableize;
///
/// assert_eq!(tableize("BlogPost"), "blog_posts");
/// assert_eq!(tableize("Person"), "people");
/// ```
pub fn tableize(short_name: &str) -> String {
    let snake = short_name.to_case(Case::Snake);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralizer::pluralize(last, 2, false)),
        None => pluralizer::pluralize(&snake, 2, false),
    }
}

/// Maps entity data to and from database documents.
#[derive(Debug, Default)]
pub struct Translator {
    caster: ValueCaster,
    casting: CastingConfig,
    field_maps: RwLock<HashMap<SmolStr, Arc<FieldMap>>>,
}

impl Translator {
    /// Create a translator with the default casting policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a translator with the given casting policy.
    pub fn with_casting(casting: CastingConfig) -> Self {
        Self {
            casting,
            ..Self::default()
        }
    }

    /// The casting policy.
    pub fn casting(&self) -> &CastingConfig {
        &self.casting
    }

    /// The value caster.
    pub fn caster(&self) -> &ValueCaster {
        &self.caster
    }

    /// Cast raw entity data for storage.
    ///
    /// Each key is resolved to a property (filter directives such as
    /// `count(inc)` are stripped first). `@dbSkip` properties are removed,
    /// properties with a `@dbFieldType` are cast, everything else is kept.
    /// Keys keep their spelling, directive included.
    ///
    /// A key the class does not declare is an error. `_id` is always allowed,
    /// and so is the fallback `id` property of a class without `@id`.
    pub fn cast_for_db(&self, data: Document, meta: &EntityMeta) -> MongoResult<Casted<Document>> {
        let map = self.field_map(meta);
        let mut result = Casted::ok(());
        let mut out = Document::new();

        for (key, value) in data {
            let Some(prop) = resolve_property(meta, &map, property_key(&key))? else {
                out.insert(key, value);
                continue;
            };

            if prop.db_skip {
                continue;
            }

            let value = match &prop.db_field_type {
                Some(ty) => {
                    let casted = self.caster.cast(value, ty);
                    result.absorb(tag(casted, &prop.name))
                }
                None => value,
            };
            out.insert(key, value);
        }

        debug!(
            entity = meta.name(),
            fields = out.len(),
            diagnostics = result.diagnostics.len(),
            "cast entity data for storage"
        );
        Ok(result.map(|_| out))
    }

    /// Name of the identifier property of an entity class.
    pub fn id_property(&self, meta: &EntityMeta) -> SmolStr {
        field_map::id_property(meta)
    }

    /// Field map of an entity class, built once per class.
    pub fn field_map(&self, meta: &EntityMeta) -> Arc<FieldMap> {
        if let Some(map) = self.field_maps.read().get(meta.name()) {
            return Arc::clone(map);
        }

        let map = Arc::new(FieldMap::build(meta));
        self.field_maps
            .write()
            .entry(SmolStr::new(meta.name()))
            .or_insert(map)
            .clone()
    }

    /// Collection an entity class is stored in.
    ///
    /// An explicit override wins over `@dbCollection`, which wins over the
    /// tableized plural of the short class name.
    pub fn collection_name(&self, meta: &EntityMeta) -> String {
        meta.collection()
            .filter(|name| !name.is_empty())
            .or_else(|| meta.db_collection().filter(|name| !name.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| tableize(meta.short_name()))
    }

    /// Name of the connection an entity class is stored through.
    pub fn connection_name<'a>(&self, meta: &'a EntityMeta) -> &'a str {
        connections::connection_name(meta)
    }

    /// Assign raw values to an entity, then re-cast all of its properties.
    ///
    /// Properties not present in `values` are re-cast too, so the entity is
    /// fully typed afterwards.
    pub fn set_values<E>(&self, entity: &mut E, values: Document) -> Casted<()>
    where
        E: Assignable + Castable + ?Sized,
    {
        entity.assign(values);
        entity.cast(&self.caster)
    }

    /// Projection of an entity without its `@ignore` properties.
    pub fn filter_for_serialization<E>(&self, entity: &E) -> Document
    where
        E: SerializeFilter + ?Sized,
    {
        entity.filter_for_serialization()
    }

    /// Build the database document of an entity.
    ///
    /// The values are cast for storage, then each property is renamed to its
    /// database field. A `null` identifier is left out so the store can
    /// generate one.
    pub fn to_document<E>(&self, entity: &E) -> MongoResult<Casted<Document>>
    where
        E: Entity + ?Sized,
    {
        let meta = entity.meta();
        let map = self.field_map(meta);
        let casted = self.cast_for_db(entity.values(), meta)?;

        Ok(casted.map(|values| {
            values
                .into_iter()
                .map(|(property, value)| (map.field_for(&property).to_string(), value))
                .filter(|(field, value)| !(field == ID_FIELD && matches!(value, Bson::Null)))
                .collect()
        }))
    }

    /// Materialize a database document into a record.
    pub fn from_document(&self, meta: Arc<EntityMeta>, doc: Document) -> Casted<Record> {
        let map = self.field_map(&meta);
        let values: Document = doc
            .into_iter()
            .map(|(field, value)| (map.property_for(&field).to_string(), value))
            .collect();

        let mut record = Record::new(meta);
        let casted = self.set_values(&mut record, values);
        casted.map(|_| record)
    }

    /// Translate a query filter written against properties into one written
    /// against database fields.
    ///
    /// Property keys are renamed and their values cast to the property's
    /// `@dbFieldType`, inside comparison operators too. `$and`, `$or` and
    /// `$nor` are translated recursively. Other operators and keys the class
    /// does not declare pass through.
    pub fn to_db_filter(&self, meta: &EntityMeta, filter: Document) -> MongoResult<Casted<Document>> {
        let map = self.field_map(meta);
        let mut result = Casted::ok(());
        let mut out = Document::new();

        for (key, value) in filter {
            if key.starts_with('$') {
                let value = if LOGICAL_OPERATORS.contains(&key.as_str()) {
                    result.absorb(self.translate_clauses(meta, value)?)
                } else {
                    value
                };
                out.insert(key, value);
                continue;
            }

            let prop = meta
                .get_property(&key)
                .or_else(|| map.get(&key).and_then(|name| meta.get_property(name)));
            let Some(prop) = prop else {
                out.insert(map.field_for(&key).to_string(), value);
                continue;
            };

            let value = match &prop.db_field_type {
                Some(ty) => result.absorb(tag(self.cast_condition(value, ty), &prop.name)),
                None => value,
            };
            out.insert(map.field_for(&prop.name).to_string(), value);
        }

        Ok(result.map(|_| out))
    }

    fn translate_clauses(&self, meta: &EntityMeta, value: Bson) -> MongoResult<Casted<Bson>> {
        let Bson::Array(clauses) = value else {
            return Ok(Casted::ok(value));
        };

        let mut result = Casted::ok(());
        let mut out = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let clause = match clause {
                Bson::Document(doc) => Bson::Document(result.absorb(self.to_db_filter(meta, doc)?)),
                other => other,
            };
            out.push(clause);
        }
        Ok(result.map(|_| Bson::Array(out)))
    }

    fn cast_condition(&self, value: Bson, ty: &FieldType) -> Casted<Bson> {
        let operators = match value {
            Bson::Document(doc) if doc.keys().next().is_some_and(|k| k.starts_with('$')) => doc,
            other => return self.caster.cast(other, ty),
        };

        let mut result = Casted::ok(());
        let mut out = Document::new();
        for (op, operand) in operators {
            let operand = if VALUE_OPERATORS.contains(&op.as_str()) {
                result.absorb(self.caster.cast(operand, ty))
            } else if LIST_OPERATORS.contains(&op.as_str()) {
                match operand {
                    Bson::Array(items) => Bson::Array(
                        items
                            .into_iter()
                            .map(|item| result.absorb(self.caster.cast(item, ty)))
                            .collect(),
                    ),
                    other => other,
                }
            } else {
                operand
            };
            out.insert(op, operand);
        }
        result.map(|_| Bson::Document(out))
    }

    /// Apply the casting policy to a result.
    ///
    /// Strict casting turns the first diagnostic into an error. Otherwise the
    /// diagnostics are logged (when enabled) and the value is returned.
    pub fn resolve<T>(&self, casted: Casted<T>) -> MongoResult<T> {
        if self.casting.strict {
            casted.strict()
        } else if self.casting.log_diagnostics {
            Ok(casted.logged())
        } else {
            Ok(casted.into_inner())
        }
    }
}

/// Resolve the metadata of a property key.
///
/// Keys may also be database field names known to the field map. `Ok(None)`
/// means the identifier (`_id` or the fallback identifier property) of a
/// class that does not declare it; its value passes through uncast.
fn resolve_property<'m>(
    meta: &'m EntityMeta,
    map: &FieldMap,
    name: &str,
) -> MongoResult<Option<&'m PropertyMeta>> {
    if let Some(prop) = meta.get_property(name) {
        return Ok(Some(prop));
    }
    if let Some(prop) = map.get(name).and_then(|mapped| meta.get_property(mapped)) {
        return Ok(Some(prop));
    }
    if name == ID_FIELD || name == map.id_property() {
        return Ok(None);
    }
    Err(SchemaError::undeclared_property(meta.name(), name).into())
}

fn tag(casted: Casted<Bson>, property: &str) -> Casted<Bson> {
    Casted {
        value: casted.value,
        diagnostics: casted.diagnostics.into_iter().map(|d| d.at(property)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caster::DiagnosticKind;
    use bson::{doc, oid::ObjectId};
    use pretty_assertions::assert_eq;

    const HEX: &str = "5949fe7259049b03f8b7821c";

    fn oid() -> ObjectId {
        ObjectId::parse_str(HEX).unwrap()
    }

    fn post() -> Arc<EntityMeta> {
        Arc::new(
            EntityMeta::builder("App\\Blog\\BlogPost")
                .property(PropertyMeta::new("id").id().db_field_type(FieldType::ObjectId))
                .property(PropertyMeta::new("authorId").db_field_name("author_id").db_field_type(FieldType::ObjectId))
                .property(PropertyMeta::new("title"))
                .property(PropertyMeta::new("count").db_field_type(FieldType::Int32))
                .property(PropertyMeta::new("preview").db_skip().db_field_type(FieldType::String))
                .property(PropertyMeta::new("secret").ignore())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_property_key() {
        assert_eq!(property_key("count(inc)"), "count");
        assert_eq!(property_key(" count ( inc )"), "count");
        assert_eq!(property_key("count"), "count");
        assert_eq!(property_key("(inc)"), "(inc)");
    }

    #[test]
    fn test_cast_for_db_casts_declared_types() {
        let translator = Translator::new();
        let casted = translator
            .cast_for_db(doc! { "id": HEX, "title": "Hello", "count": "3" }, &post())
            .unwrap();

        assert!(casted.is_clean());
        assert_eq!(casted.value, doc! { "id": oid(), "title": "Hello", "count": 3 });
    }

    #[test]
    fn test_cast_for_db_strips_filter_directive() {
        let casted = Translator::new()
            .cast_for_db(doc! { "count(inc)": "2" }, &post())
            .unwrap();
        assert_eq!(casted.value, doc! { "count(inc)": 2 });
    }

    #[test]
    fn test_cast_for_db_directive_on_plain_property() {
        let casted = Translator::new()
            .cast_for_db(doc! { "title(set)": 5 }, &post())
            .unwrap();
        assert_eq!(casted.value, doc! { "title(set)": 5 });
    }

    #[test]
    fn test_cast_for_db_removes_skipped() {
        let casted = Translator::new()
            .cast_for_db(doc! { "title": "x", "preview": 42 }, &post())
            .unwrap();
        assert_eq!(casted.value, doc! { "title": "x" });
    }

    #[test]
    fn test_cast_for_db_keeps_malformed_ids() {
        let casted = Translator::new()
            .cast_for_db(doc! { "id": "foo", "authorId": 42 }, &post())
            .unwrap();

        assert_eq!(casted.value, doc! { "id": "foo", "authorId": 42 });
        let kinds: Vec<_> = casted.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::MalformedObjectId, DiagnosticKind::NotAString]);
        assert_eq!(casted.diagnostics[1].property.as_deref(), Some("authorId"));
    }

    #[test]
    fn test_cast_for_db_undeclared_is_error() {
        let err = Translator::new()
            .cast_for_db(doc! { "nickname": "x" }, &post())
            .unwrap_err();
        assert!(err.is_undeclared_property());

        let err = Translator::new()
            .cast_for_db(doc! { "nickname(inc)": 1 }, &post())
            .unwrap_err();
        assert!(err.is_undeclared_property());
    }

    #[test]
    fn test_cast_for_db_accepts_field_names() {
        let casted = Translator::new()
            .cast_for_db(doc! { "_id": HEX, "author_id": HEX }, &post())
            .unwrap();
        assert_eq!(casted.value, doc! { "_id": oid(), "author_id": oid() });
    }

    #[test]
    fn test_cast_for_db_is_idempotent() {
        let translator = Translator::new();
        let data = doc! { "id": HEX, "count(inc)": "4", "title": "t", "preview": "p", "authorId": "foo" };

        let once = translator.cast_for_db(data, &post()).unwrap().value;
        let twice = translator.cast_for_db(once.clone(), &post()).unwrap().value;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_field_map_is_memoized() {
        let translator = Translator::new();
        let first = translator.field_map(&post());
        let second = translator.field_map(&post());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get("author_id"), Some("authorId"));
        assert_eq!(first.get("_id"), Some("id"));
    }

    #[test]
    fn test_collection_name_precedence() {
        let translator = Translator::new();
        assert_eq!(translator.collection_name(&post()), "blog_posts");

        let annotated = EntityMeta::builder("BlogPost")
            .db_collection("posts")
            .build()
            .unwrap();
        assert_eq!(translator.collection_name(&annotated), "posts");

        let overridden = EntityMeta::builder("BlogPost")
            .collection("articles")
            .db_collection("posts")
            .build()
            .unwrap();
        assert_eq!(translator.collection_name(&overridden), "articles");
    }

    #[test]
    fn test_tableize() {
        assert_eq!(tableize("BlogPost"), "blog_posts");
        assert_eq!(tableize("User"), "users");
        assert_eq!(tableize("Category"), "categories");
    }

    #[test]
    fn test_connection_name() {
        let translator = Translator::new();
        assert_eq!(translator.connection_name(&post()), "default");

        let reporting = EntityMeta::builder("Report").db("reporting").build().unwrap();
        assert_eq!(translator.connection_name(&reporting), "reporting");

        let blank = EntityMeta::builder("Report").db("").build().unwrap();
        assert_eq!(translator.connection_name(&blank), "default");
    }

    #[test]
    fn test_set_values_recasts_everything() {
        let translator = Translator::new();
        let mut record = Record::new(post());
        record.set("id", Bson::String(HEX.into()));

        let casted = translator.set_values(&mut record, doc! { "count": "7", "title": "t" });

        assert!(casted.is_clean());
        assert_eq!(record.get("id"), Some(Bson::ObjectId(oid())));
        assert_eq!(record.get("count"), Some(Bson::Int32(7)));
        assert_eq!(record.get("title"), Some(Bson::String("t".into())));
    }

    #[test]
    fn test_filter_for_serialization() {
        let record = Record::with_values(post(), doc! { "title": "t", "secret": "s", "preview": "p" });
        let view = Translator::new().filter_for_serialization(&record);
        assert_eq!(view, doc! { "title": "t", "preview": "p" });
    }

    #[test]
    fn test_to_document_renames_fields() {
        let record = Record::with_values(
            post(),
            doc! { "id": HEX, "authorId": HEX, "title": "t", "preview": "p", "secret": "s" },
        );
        let doc = Translator::new().to_document(&record).unwrap();

        assert!(doc.is_clean());
        assert_eq!(
            doc.value,
            doc! { "_id": oid(), "author_id": oid(), "title": "t", "secret": "s" }
        );
    }

    #[test]
    fn test_to_document_drops_null_id() {
        let record = Record::with_values(post(), doc! { "id": Bson::Null, "title": "t" });
        let doc = Translator::new().to_document(&record).unwrap().value;
        assert_eq!(doc, doc! { "title": "t" });
    }

    #[test]
    fn test_from_document_renames_and_casts() {
        let record = Translator::new()
            .from_document(post(), doc! { "_id": oid(), "author_id": HEX, "count": "2" })
            .into_inner();

        assert_eq!(
            record.as_document(),
            &doc! { "id": oid(), "authorId": oid(), "count": 2 }
        );
    }

    #[test]
    fn test_to_db_filter() {
        let filter = Translator::new()
            .to_db_filter(&post(), doc! { "id": HEX, "authorId": { "$in": [HEX, "bad"] }, "title": "t" })
            .unwrap();

        assert_eq!(
            filter.value,
            doc! { "_id": oid(), "author_id": { "$in": [oid(), "bad"] }, "title": "t" }
        );
        assert_eq!(filter.diagnostics.len(), 1);
    }

    #[test]
    fn test_to_db_filter_logical_operators() {
        let filter = Translator::new()
            .to_db_filter(
                &post(),
                doc! { "$or": [{ "count": { "$gt": "3" } }, { "authorId": HEX }], "meta.tags": "x" },
            )
            .unwrap()
            .into_inner();

        assert_eq!(
            filter,
            doc! { "$or": [{ "count": { "$gt": 3 } }, { "author_id": oid() }], "meta.tags": "x" }
        );
    }

    fn tag_meta() -> Arc<EntityMeta> {
        Arc::new(
            EntityMeta::builder("Tag")
                .property(PropertyMeta::new("name").db_field_type(FieldType::String))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_undeclared_id_property_round_trip() {
        let translator = Translator::new();
        assert_eq!(translator.id_property(&tag_meta()), "id");

        let record = Record::with_values(tag_meta(), doc! { "name": 7, "id": oid() });
        let stored = translator.to_document(&record).unwrap();
        assert!(stored.is_clean());
        assert_eq!(stored.value, doc! { "name": "7", "_id": oid() });

        let loaded = translator.from_document(tag_meta(), stored.value).into_inner();
        assert_eq!(loaded.as_document(), &doc! { "name": "7", "id": oid() });
    }

    #[test]
    fn test_undeclared_id_property_passes_uncast() {
        let casted = Translator::new()
            .cast_for_db(doc! { "id": HEX, "_id": HEX }, &tag_meta())
            .unwrap();
        assert_eq!(casted.value, doc! { "id": HEX, "_id": HEX });

        let err = Translator::new()
            .cast_for_db(doc! { "key": HEX }, &tag_meta())
            .unwrap_err();
        assert!(err.is_undeclared_property());
    }

    #[test]
    fn test_to_db_filter_undeclared_id_property() {
        let filter = Translator::new()
            .to_db_filter(&tag_meta(), doc! { "id": oid(), "name": 3 })
            .unwrap()
            .into_inner();
        assert_eq!(filter, doc! { "_id": oid(), "name": "3" });
    }

    #[test]
    fn test_resolve_policy() {
        let casted = ValueCaster::new().cast("foo".into(), &FieldType::ObjectId);

        let lenient = Translator::new();
        assert_eq!(lenient.resolve(casted.clone()).unwrap(), Bson::String("foo".into()));

        let strict = Translator::with_casting(CastingConfig {
            strict: true,
            ..CastingConfig::default()
        });
        assert!(strict.resolve(casted).unwrap_err().is_cast_error());
    }
}
