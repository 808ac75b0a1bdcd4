//! Entity-level access to a document store.

use std::sync::Arc;

use bson::{Bson, Document};
use docmap_schema::EntityMeta;
use tracing::debug;

use crate::document::ID_FIELD;
use crate::entity::{Entity, Identifiable, Record};
use crate::error::{MongoError, MongoResult};
use crate::store::{DocumentStore, FindOptions, ReplaceOutcome};
use crate::translator::Translator;

/// A document store bound to one entity class.
///
/// Entities are translated on the way in, filters are written against
/// property names and translated before they reach the store, and results
/// come back as fully cast [`Record`]s. Cast diagnostics are handled by the
/// translator's casting policy.
#[derive(Debug, Clone)]
pub struct EntityCollection<S> {
    meta: Arc<EntityMeta>,
    translator: Arc<Translator>,
    store: S,
}

impl<S: DocumentStore> EntityCollection<S> {
    /// Bind a store to an entity class.
    pub fn new(meta: Arc<EntityMeta>, translator: Arc<Translator>, store: S) -> Self {
        Self {
            meta,
            translator,
            store,
        }
    }

    /// The entity class.
    pub fn meta(&self) -> &Arc<EntityMeta> {
        &self.meta
    }

    /// The translator.
    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Name of the underlying collection.
    pub fn name(&self) -> &str {
        self.store.name()
    }

    /// Create an empty record of this entity class.
    pub fn record(&self) -> Record {
        Record::new(Arc::clone(&self.meta))
    }

    /// Insert an entity and assign the generated identifier to it.
    pub async fn insert<E>(&self, entity: &mut E) -> MongoResult<Bson>
    where
        E: Entity + ?Sized,
    {
        self.check_class(entity.meta())?;
        let doc = self.translator.resolve(self.translator.to_document(entity)?)?;
        let id = self.store.insert_one(doc).await?;
        self.use_result_id(entity, id)
    }

    /// Insert entities and assign the generated identifiers to them.
    pub async fn insert_many<E>(&self, entities: &mut [E]) -> MongoResult<Vec<Bson>>
    where
        E: Entity,
    {
        let mut docs = Vec::with_capacity(entities.len());
        for entity in entities.iter() {
            self.check_class(entity.meta())?;
            docs.push(self.translator.resolve(self.translator.to_document(entity)?)?);
        }

        let ids = self.store.insert_many(docs).await?;
        entities
            .iter_mut()
            .zip(ids)
            .map(|(entity, id)| self.use_result_id(entity, id))
            .collect()
    }

    /// Store an entity: replace it when it has an identifier, insert it otherwise.
    pub async fn save<E>(&self, entity: &mut E) -> MongoResult<Bson>
    where
        E: Entity + ?Sized,
    {
        if entity.id().is_none() {
            return self.insert(entity).await;
        }

        self.check_class(entity.meta())?;
        let doc = self.translator.resolve(self.translator.to_document(entity)?)?;
        let id = doc
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| MongoError::internal("translated document has no _id"))?;

        let mut filter = Document::new();
        filter.insert(ID_FIELD, id.clone());
        let ReplaceOutcome { upserted_id, .. } = self.store.replace_one(filter, doc, true).await?;
        debug!(entity = self.meta.name(), upserted = upserted_id.is_some(), "saved entity");

        self.use_result_id(entity, upserted_id.unwrap_or(id))
    }

    /// Find entities matching a filter written against property names.
    pub async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Record>> {
        let filter = self.db_filter(filter)?;
        let options = FindOptions {
            sort: options.sort.map(|sort| self.db_sort(sort)),
            ..options
        };

        self.store
            .find(filter, options)
            .await?
            .into_iter()
            .map(|doc| self.materialize(doc))
            .collect()
    }

    /// Find the first entity matching a filter.
    pub async fn find_one(&self, filter: Document) -> MongoResult<Option<Record>> {
        let filter = self.db_filter(filter)?;
        self.store
            .find_one(filter)
            .await?
            .map(|doc| self.materialize(doc))
            .transpose()
    }

    /// Find an entity by identifier.
    pub async fn find_by_id(&self, id: impl Into<Bson>) -> MongoResult<Option<Record>> {
        let property = self.translator.id_property(&self.meta);
        let mut filter = Document::new();
        filter.insert(property.as_str(), id.into());
        self.find_one(filter).await
    }

    /// Count entities matching a filter.
    pub async fn count(&self, filter: Document) -> MongoResult<u64> {
        let filter = self.db_filter(filter)?;
        self.store.count(filter).await
    }

    /// Delete entities matching a filter.
    pub async fn delete_many(&self, filter: Document) -> MongoResult<u64> {
        let filter = self.db_filter(filter)?;
        self.store.delete_many(filter).await
    }

    /// Assign a store-generated identifier to an entity.
    ///
    /// The identifier is cast to the declared type of the identifier property.
    pub fn use_result_id<E>(&self, entity: &mut E, id: Bson) -> MongoResult<Bson>
    where
        E: Entity + ?Sized,
    {
        let property = entity.id_property();
        let id = match entity.meta().get_property(&property).and_then(|p| p.value_type()) {
            Some(ty) => {
                let casted = self.translator.caster().cast(id, ty);
                self.translator.resolve(casted)?
            }
            None => id,
        };
        entity.set_id(id.clone());
        Ok(id)
    }

    fn check_class(&self, meta: &EntityMeta) -> MongoResult<()> {
        if meta.name() == self.meta.name() {
            Ok(())
        } else {
            Err(MongoError::internal(format!(
                "collection `{}` stores `{}`, not `{}`",
                self.name(),
                self.meta.name(),
                meta.name()
            )))
        }
    }

    fn db_filter(&self, filter: Document) -> MongoResult<Document> {
        self.translator
            .resolve(self.translator.to_db_filter(&self.meta, filter)?)
    }

    fn db_sort(&self, sort: Document) -> Document {
        let map = self.translator.field_map(&self.meta);
        sort.into_iter()
            .map(|(property, direction)| (map.field_for(&property).to_string(), direction))
            .collect()
    }

    fn materialize(&self, doc: Document) -> MongoResult<Record> {
        let casted = self.translator.from_document(Arc::clone(&self.meta), doc);
        self.translator.resolve(casted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bson::{doc, oid::ObjectId};
    use docmap_schema::{FieldType, PropertyMeta};
    use pretty_assertions::assert_eq;

    fn user() -> Arc<EntityMeta> {
        Arc::new(
            EntityMeta::builder("User")
                .property(PropertyMeta::new("id").id().db_field_type(FieldType::ObjectId))
                .property(PropertyMeta::new("displayName").db_field_name("display_name"))
                .property(PropertyMeta::new("age").db_field_type(FieldType::Int32))
                .property(PropertyMeta::new("draft").db_skip())
                .build()
                .unwrap(),
        )
    }

    fn users() -> EntityCollection<MemoryStore> {
        EntityCollection::new(user(), Arc::new(Translator::new()), MemoryStore::new("users"))
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let users = users();
        let mut record = users.record();
        record.set("displayName", "Ada".into());
        record.set("draft", "unsaved".into());

        let id = users.insert(&mut record).await.unwrap();

        assert!(matches!(id, Bson::ObjectId(_)));
        assert_eq!(record.id(), Some(id.clone()));
        assert_eq!(
            users.store().documents(),
            vec![doc! { "_id": id, "display_name": "Ada" }]
        );
    }

    #[tokio::test]
    async fn test_insert_many_assigns_ids() {
        let users = users();
        let mut records = vec![users.record(), users.record()];
        records[0].set("age", "30".into());
        records[1].set("age", Bson::Int32(40));

        let ids = users.insert_many(&mut records).await.unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(records[0].id(), Some(ids[0].clone()));
        assert_eq!(records[1].id(), Some(ids[1].clone()));
        assert_eq!(users.count(doc! { "age": { "$gte": "30" } }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_save_inserts_then_replaces() {
        let users = users();
        let mut record = users.record();
        record.set("displayName", "Ada".into());

        let id = users.save(&mut record).await.unwrap();
        record.set("displayName", "Ada L.".into());
        let again = users.save(&mut record).await.unwrap();

        assert_eq!(id, again);
        assert_eq!(users.store().len(), 1);
        let found = users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.get("displayName"), Some(Bson::String("Ada L.".into())));
    }

    fn tags() -> EntityCollection<MemoryStore> {
        let meta = Arc::new(
            EntityMeta::builder("Tag")
                .property(PropertyMeta::new("name"))
                .build()
                .unwrap(),
        );
        EntityCollection::new(meta, Arc::new(Translator::new()), MemoryStore::new("tags"))
    }

    #[tokio::test]
    async fn test_save_twice_without_declared_id() {
        let tags = tags();
        let mut record = tags.record();
        record.set("name", "rust".into());

        let id = tags.save(&mut record).await.unwrap();
        assert_eq!(record.get("id"), Some(id.clone()));

        record.set("name", "bson".into());
        let again = tags.save(&mut record).await.unwrap();

        assert_eq!(id, again);
        assert_eq!(tags.store().documents(), vec![doc! { "_id": id, "name": "bson" }]);
    }

    #[tokio::test]
    async fn test_find_then_save_without_declared_id() {
        let tags = tags();
        let mut record = tags.record();
        record.set("name", "rust".into());
        let id = tags.insert(&mut record).await.unwrap();

        let mut found = tags.find_one(doc! { "id": id.clone() }).await.unwrap().unwrap();
        assert_eq!(found.id(), Some(id.clone()));

        found.set("name", "tokio".into());
        tags.save(&mut found).await.unwrap();

        assert_eq!(tags.count(doc! {}).await.unwrap(), 1);
        let stored = tags.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.get("name"), Some(Bson::String("tokio".into())));
    }

    #[tokio::test]
    async fn test_save_with_string_id_upserts() {
        let users = users();
        let hex = "5949fe7259049b03f8b7821c";
        let mut record = users.record();
        record.set("id", hex.into());

        let id = users.save(&mut record).await.unwrap();

        assert_eq!(id, Bson::ObjectId(ObjectId::parse_str(hex).unwrap()));
        assert_eq!(users.count(doc! { "id": hex }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_translates_filter_sort_and_results() {
        let users = users();
        users
            .store()
            .insert_many(vec![
                doc! { "display_name": "Bob", "age": "25" },
                doc! { "display_name": "Ada", "age": 36 },
            ])
            .await
            .unwrap();

        let found = users
            .find(doc! {}, FindOptions::new().sort(doc! { "displayName": 1 }))
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|r| r.get("displayName")).collect();
        assert_eq!(
            names,
            vec![Some(Bson::String("Ada".into())), Some(Bson::String("Bob".into()))]
        );
        assert_eq!(found[1].get("age"), Some(Bson::Int32(25)));
        assert!(matches!(found[0].get("id"), Some(Bson::ObjectId(_))));

        let ada = users.find_one(doc! { "displayName": "Ada" }).await.unwrap();
        assert!(ada.is_some());
    }

    #[tokio::test]
    async fn test_delete_many() {
        let users = users();
        let mut record = users.record();
        let id = users.insert(&mut record).await.unwrap();

        let id_hex = match &id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => panic!("unexpected id {:?}", other),
        };
        assert_eq!(users.delete_many(doc! { "id": id_hex }).await.unwrap(), 1);
        assert!(users.store().is_empty());
    }

    #[tokio::test]
    async fn test_other_class_rejected() {
        let users = users();
        let other = Arc::new(EntityMeta::builder("Post").build().unwrap());
        let mut record = Record::new(other);
        assert!(users.insert(&mut record).await.is_err());
    }
}
