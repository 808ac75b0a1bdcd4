//! In-process document store.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use parking_lot::Mutex;
use smol_str::SmolStr;
use tracing::debug;

use super::{DocumentStore, FindOptions, ReplaceOutcome};
use crate::document::{ID_FIELD, use_result_id};
use crate::error::{MongoError, MongoResult};

/// A [`DocumentStore`] kept in memory.
///
/// Documents are kept in insertion order. Filters support equality on
/// (dotted) field paths, the comparison operators `$eq`, `$ne`, `$gt`,
/// `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, and the logical
/// operators `$and`, `$or`, `$nor`. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    name: SmolStr,
    docs: Arc<Mutex<Vec<Document>>>,
}

impl MemoryStore {
    /// Create an empty collection.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            docs: Arc::default(),
        }
    }

    /// Snapshot of every stored document.
    pub fn documents(&self) -> Vec<Document> {
        self.docs.lock().clone()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.lock().is_empty()
    }

    fn prepare(&self, docs: &[Document], mut doc: Document) -> MongoResult<(Document, Bson)> {
        let id = match doc.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                use_result_id(&mut doc, ID_FIELD, id.clone());
                id
            }
        };

        if docs.iter().any(|existing| existing.get(ID_FIELD) == Some(&id)) {
            return Err(MongoError::duplicate_key(format!(
                "{} already has a document with _id {}",
                self.name, id
            )));
        }
        Ok((doc, id))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, doc: Document) -> MongoResult<Bson> {
        debug!(collection = %self.name, "insert_one");
        let mut docs = self.docs.lock();
        let (doc, id) = self.prepare(&docs, doc)?;
        docs.push(doc);
        Ok(id)
    }

    async fn insert_many(&self, new_docs: Vec<Document>) -> MongoResult<Vec<Bson>> {
        debug!(collection = %self.name, count = new_docs.len(), "insert_many");
        let mut docs = self.docs.lock();
        let mut staged: Vec<Document> = Vec::with_capacity(new_docs.len());
        let mut ids = Vec::with_capacity(new_docs.len());

        for doc in new_docs {
            let (doc, id) = self.prepare(&docs, doc)?;
            if staged.iter().any(|d| d.get(ID_FIELD) == Some(&id)) {
                return Err(MongoError::duplicate_key(format!(
                    "batch for {} repeats _id {}",
                    self.name, id
                )));
            }
            staged.push(doc);
            ids.push(id);
        }

        docs.extend(staged);
        Ok(ids)
    }

    async fn replace_one(
        &self,
        filter: Document,
        mut doc: Document,
        upsert: bool,
    ) -> MongoResult<ReplaceOutcome> {
        debug!(collection = %self.name, filter = %filter, upsert, "replace_one");
        let mut docs = self.docs.lock();

        if let Some(position) = docs.iter().position(|d| matches(d, &filter)) {
            let existing_id = docs[position].get(ID_FIELD).cloned().unwrap_or(Bson::Null);
            match doc.get(ID_FIELD) {
                Some(id) if *id != existing_id => {
                    return Err(MongoError::internal("replacement may not change _id"));
                }
                Some(_) => {}
                None => use_result_id(&mut doc, ID_FIELD, existing_id),
            }

            let modified = u64::from(docs[position] != doc);
            docs[position] = doc;
            return Ok(ReplaceOutcome {
                matched: 1,
                modified,
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(ReplaceOutcome::default());
        }

        if !doc.contains_key(ID_FIELD) {
            if let Some(id) = filter.get(ID_FIELD).filter(|id| !is_operator_doc(id)) {
                use_result_id(&mut doc, ID_FIELD, id.clone());
            }
        }
        let (doc, id) = self.prepare(&docs, doc)?;
        docs.push(doc);
        Ok(ReplaceOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        })
    }

    async fn find(&self, filter: Document, options: FindOptions) -> MongoResult<Vec<Document>> {
        debug!(collection = %self.name, filter = %filter, "find");
        let mut found: Vec<Document> = self
            .docs
            .lock()
            .iter()
            .filter(|d| matches(d, &filter))
            .cloned()
            .collect();

        if let Some(sort) = &options.sort {
            found.sort_by(|a, b| compare_by(a, b, sort));
        }

        let skip = options.skip.map_or(0, |s| usize::try_from(s).unwrap_or(usize::MAX));
        let found = found.into_iter().skip(skip);
        // A negative limit means a single batch of that size
        Ok(match options.limit.filter(|l| *l != 0) {
            Some(limit) => found
                .take(usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX))
                .collect(),
            None => found.collect(),
        })
    }

    async fn count(&self, filter: Document) -> MongoResult<u64> {
        debug!(collection = %self.name, filter = %filter, "count");
        let count = self.docs.lock().iter().filter(|d| matches(d, &filter)).count();
        Ok(count as u64)
    }

    async fn delete_many(&self, filter: Document) -> MongoResult<u64> {
        debug!(collection = %self.name, filter = %filter, "delete_many");
        let mut docs = self.docs.lock();
        let before = docs.len();
        docs.retain(|d| !matches(d, &filter));
        Ok((before - docs.len()) as u64)
    }
}

/// Check if a document matches a query filter.
fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => clauses(condition).all(|c| matches(doc, c)),
        "$or" => clauses(condition).any(|c| matches(doc, c)),
        "$nor" => !clauses(condition).any(|c| matches(doc, c)),
        path => field_matches(lookup(doc, path), condition),
    })
}

fn clauses(condition: &Bson) -> impl Iterator<Item = &Document> {
    condition
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Bson::as_document)
}

fn is_operator_doc(value: &Bson) -> bool {
    value
        .as_document()
        .and_then(|d| d.keys().next())
        .is_some_and(|k| k.starts_with('$'))
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> bool {
    match condition {
        Bson::Document(ops) if is_operator_doc(condition) => {
            ops.iter().all(|(op, operand)| operator_matches(value, op, operand))
        }
        _ => equals(value, condition),
    }
}

fn operator_matches(value: Option<&Bson>, op: &str, operand: &Bson) -> bool {
    match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" => ordered(value, operand, |o| o == Ordering::Greater),
        "$gte" => ordered(value, operand, |o| o != Ordering::Less),
        "$lt" => ordered(value, operand, |o| o == Ordering::Less),
        "$lte" => ordered(value, operand, |o| o != Ordering::Greater),
        "$in" => operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| equals(value, item))),
        "$nin" => !operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| equals(value, item))),
        "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
        _ => false,
    }
}

/// Equality with array membership, as the server does it.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn ordered(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|v| compare_values(v, operand))
        .is_some_and(accept)
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Order two values of comparable types, `None` across type brackets.
fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn compare_by(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (path, direction) in sort {
        let descending = as_number(direction).is_some_and(|d| d < 0.0);
        let ordering = match (lookup(a, path), lookup(b, path)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        };
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Resolve a dotted field path.
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}
