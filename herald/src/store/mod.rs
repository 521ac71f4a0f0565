//! Document store contract.
//!
//! A [`Store`] keeps JSON documents in named collections. Filters match
//! top-level fields by equality; an empty filter matches everything.
//!
//! Implementations:
//! - [`MongoStore`]: MongoDB database named by the configuration
//! - [`MemoryStore`]: process memory, for tests and local runs

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// A stored document.
pub type Document = serde_json::Map<String, Value>;

/// Field assigned to every inserted document.
pub const ID_FIELD: &str = "_id";

/// Errors raised by a [`Store`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// A value could not be converted to or from a document.
    #[error("document conversion failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value did not serialize to a JSON object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// An update document used an unsupported operator.
    #[error("unsupported update operator: {0}")]
    UnsupportedOperator(String),

    /// Replacement documents can only target one document.
    #[error("update_many requires update operators, got a replacement document")]
    ReplaceMany,

    /// The backend failed.
    #[error("store backend failed: {0}")]
    Backend(String),

    /// The MongoDB driver failed.
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A document could not be encoded as BSON.
    #[error("BSON encoding failed: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Sort on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field to sort on.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

impl Sort {
    /// Sorts ascending on `field`.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    /// Sorts descending on `field`.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Paging and ordering for [`Store::get_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Documents to skip.
    pub skip: usize,
    /// Maximum documents to return; `0` means no limit.
    pub limit: usize,
    /// Order applied before paging.
    pub sort: Option<Sort>,
}

/// Options for updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document built from the filter and update when nothing matches.
    pub upsert: bool,
}

/// Result of an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertAck {
    /// Ids assigned to the inserted documents, in input order.
    pub inserted_ids: Vec<Value>,
}

/// Result of an update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateAck {
    /// Documents matching the filter.
    pub matched: u64,
    /// Documents changed.
    pub modified: u64,
    /// Id of the inserted document, when upserted.
    pub upserted_id: Option<Value>,
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteAck {
    /// Documents removed.
    pub deleted: u64,
}

/// A generic create/read/update/delete document store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts one document.
    async fn create_one(&self, collection: &str, doc: Document) -> Result<InsertAck, StoreError>;

    /// Inserts several documents.
    async fn create_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<InsertAck, StoreError>;

    /// Returns the first document matching `filter`.
    async fn get_one(&self, collection: &str, filter: &Document)
    -> Result<Option<Document>, StoreError>;

    /// Returns the documents matching `filter`, sorted then paged.
    async fn get_many(
        &self,
        collection: &str,
        filter: &Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    /// Applies `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError>;

    /// Applies `update` to every document matching `filter`.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError>;

    /// Removes the first document matching `filter`.
    async fn delete_one(&self, collection: &str, filter: &Document)
    -> Result<DeleteAck, StoreError>;

    /// Removes every document matching `filter`.
    async fn delete_many(&self, collection: &str, filter: &Document)
    -> Result<DeleteAck, StoreError>;
}

/// Serializes `value` into a document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(doc) => Ok(doc),
        Value::Null => Err(StoreError::NotAnObject("null")),
        Value::Bool(_) => Err(StoreError::NotAnObject("bool")),
        Value::Number(_) => Err(StoreError::NotAnObject("number")),
        Value::String(_) => Err(StoreError::NotAnObject("string")),
        Value::Array(_) => Err(StoreError::NotAnObject("array")),
    }
}

/// Deserializes a document, ignoring fields `T` does not know.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Builds an equality filter from `(field, value)` pairs.
pub fn filter<I, K, V>(pairs: I) -> Document
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
