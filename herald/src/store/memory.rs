//! In-memory document store.

use super::{
    DeleteAck, Document, FindOptions, ID_FIELD, InsertAck, SortOrder, Store, StoreError,
    UpdateAck, UpdateOptions,
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Document>>,
    next_id: u64,
}

impl Inner {
    fn insert(&mut self, collection: &str, mut doc: Document) -> Value {
        let id = match doc.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                self.next_id += 1;
                let id = Value::from(self.next_id);
                doc.insert(ID_FIELD.to_string(), id.clone());
                id
            }
        };
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        id
    }

    fn update(
        &mut self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
        many: bool,
    ) -> Result<UpdateAck, StoreError> {
        let change = Change::parse(update)?;
        if many && matches!(change, Change::Replace(_)) {
            return Err(StoreError::ReplaceMany);
        }
        let mut ack = UpdateAck::default();

        if let Some(docs) = self.collections.get_mut(collection) {
            for doc in docs.iter_mut().filter(|doc| matches(doc, filter)) {
                ack.matched += 1;
                if change.apply(doc) {
                    ack.modified += 1;
                }
                if !many {
                    break;
                }
            }
        }

        if ack.matched == 0 && options.upsert {
            let mut doc = filter.clone();
            change.apply(&mut doc);
            ack.upserted_id = Some(self.insert(collection, doc));
        }
        Ok(ack)
    }

    fn delete(&mut self, collection: &str, filter: &Document, many: bool) -> DeleteAck {
        let Some(docs) = self.collections.get_mut(collection) else {
            return DeleteAck::default();
        };
        let before = docs.len();
        if many {
            docs.retain(|doc| !matches(doc, filter));
        } else if let Some(pos) = docs.iter().position(|doc| matches(doc, filter)) {
            docs.remove(pos);
        }
        DeleteAck {
            deleted: (before - docs.len()) as u64,
        }
    }
}

/// The parsed form of an update document.
enum Change<'a> {
    /// `$set` and `$unset` operators.
    Operators {
        set: Option<&'a Document>,
        unset: Option<&'a Document>,
    },
    /// A plain document replacing everything but the id.
    Replace(&'a Document),
}

impl<'a> Change<'a> {
    fn parse(update: &'a Document) -> Result<Self, StoreError> {
        if !update.keys().any(|key| key.starts_with('$')) {
            return Ok(Change::Replace(update));
        }
        let mut set = None;
        let mut unset = None;
        for (op, fields) in update {
            let fields = fields
                .as_object()
                .ok_or_else(|| StoreError::UnsupportedOperator(op.clone()))?;
            match op.as_str() {
                "$set" => set = Some(fields),
                "$unset" => unset = Some(fields),
                other => return Err(StoreError::UnsupportedOperator(other.to_string())),
            }
        }
        Ok(Change::Operators { set, unset })
    }

    /// Applies the change; returns `true` if `doc` was modified.
    fn apply(&self, doc: &mut Document) -> bool {
        let before = doc.clone();
        match self {
            Change::Operators { set, unset } => {
                for (field, value) in set.iter().flat_map(|fields| fields.iter()) {
                    doc.insert(field.clone(), value.clone());
                }
                for field in unset.iter().flat_map(|fields| fields.keys()) {
                    doc.remove(field);
                }
            }
            Change::Replace(replacement) => {
                let id = doc.remove(ID_FIELD);
                *doc = (*replacement).clone();
                if let Some(id) = id {
                    doc.insert(ID_FIELD.to_string(), id);
                }
            }
        }
        *doc != before
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| doc.get(field).unwrap_or(&Value::Null) == expected)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// A [`Store`] keeping every collection in process memory.
///
/// Ids are assigned from a counter shared by all collections. Documents keep
/// insertion order when no sort is requested.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().collections.get(collection).map_or(0, Vec::len)
    }

    /// Returns `true` if `collection` holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_one(&self, collection: &str, doc: Document) -> Result<InsertAck, StoreError> {
        let id = self.lock().insert(collection, doc);
        Ok(InsertAck {
            inserted_ids: vec![id],
        })
    }

    async fn create_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<InsertAck, StoreError> {
        let mut inner = self.lock();
        let inserted_ids = docs
            .into_iter()
            .map(|doc| inner.insert(collection, doc))
            .collect();
        Ok(InsertAck { inserted_ids })
    }

    async fn get_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, filter)))
            .cloned())
    }

    async fn get_many(
        &self,
        collection: &str,
        filter: &Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut found: Vec<Document> = {
            let inner = self.lock();
            inner
                .collections
                .get(collection)
                .map(|docs| docs.iter().filter(|doc| matches(doc, filter)).cloned().collect())
                .unwrap_or_default()
        };

        if let Some(sort) = &options.sort {
            found.sort_by(|a, b| {
                let ord = compare(
                    a.get(&sort.field).unwrap_or(&Value::Null),
                    b.get(&sort.field).unwrap_or(&Value::Null),
                );
                match sort.order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }

        let limit = if options.limit == 0 {
            usize::MAX
        } else {
            options.limit
        };
        Ok(found.into_iter().skip(options.skip).take(limit).collect())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError> {
        self.lock().update(collection, filter, update, options, false)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError> {
        self.lock().update(collection, filter, update, options, true)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<DeleteAck, StoreError> {
        Ok(self.lock().delete(collection, filter, false))
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<DeleteAck, StoreError> {
        Ok(self.lock().delete(collection, filter, true))
    }
}
