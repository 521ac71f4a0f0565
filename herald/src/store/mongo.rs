//! MongoDB document store.

use super::{
    DeleteAck, Document, FindOptions, InsertAck, Sort, SortOrder, Store, StoreError, UpdateAck,
    UpdateOptions,
};
use crate::config::HeraldConfig;
use async_trait::async_trait;
use mongodb::{
    Client, Collection, Database,
    bson::{self, Bson},
    options::{self, ReplaceOptions},
    results::UpdateResult,
};

type BsonDocument = bson::Document;

/// A [`Store`] backed by one MongoDB database.
///
/// Documents cross the driver as BSON. Server-assigned ids come back as
/// relaxed extended JSON (`{"$oid": "..."}`) and are accepted in filters in
/// the same form.
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Uses database `db_name` of an existing client.
    pub fn new(client: &Client, db_name: &str) -> Self {
        Self {
            database: client.database(db_name),
        }
    }

    /// Creates a client for `connection_string` and uses database `db_name`.
    ///
    /// The driver connects lazily, so an unreachable server surfaces on the
    /// first operation.
    pub async fn connect(connection_string: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(connection_string).await?;
        Ok(Self::new(&client, db_name))
    }

    /// Connects with the store settings of `config`.
    pub async fn from_config(config: &HeraldConfig) -> Result<Self, StoreError> {
        Self::connect(&config.connection_string, &config.db_name).await
    }

    /// Get the database reference.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }
}

fn to_bson(doc: &Document) -> Result<BsonDocument, StoreError> {
    Ok(bson::to_document(doc)?)
}

fn from_bson(doc: BsonDocument) -> Document {
    doc.into_iter()
        .map(|(field, value)| (field, value.into_relaxed_extjson()))
        .collect()
}

fn sort_document(sort: &Sort) -> BsonDocument {
    let direction = match sort.order {
        SortOrder::Ascending => 1,
        SortOrder::Descending => -1,
    };
    let mut doc = BsonDocument::new();
    doc.insert(sort.field.clone(), direction);
    doc
}

fn find_options(options: &FindOptions) -> options::FindOptions {
    let mut find = options::FindOptions::default();
    find.skip = (options.skip > 0).then_some(options.skip as u64);
    // The driver treats a negative limit as a single batch; keep it positive.
    find.limit = (options.limit > 0).then(|| i64::try_from(options.limit).unwrap_or(i64::MAX));
    find.sort = options.sort.as_ref().map(sort_document);
    find
}

/// Update documents without `$` operators replace the matched document.
fn is_replacement(update: &Document) -> bool {
    !update.keys().any(|key| key.starts_with('$'))
}

fn update_ack(result: UpdateResult) -> UpdateAck {
    UpdateAck {
        matched: result.matched_count,
        modified: result.modified_count,
        upserted_id: result.upserted_id.map(Bson::into_relaxed_extjson),
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn create_one(&self, collection: &str, doc: Document) -> Result<InsertAck, StoreError> {
        let result = self.collection(collection).insert_one(to_bson(&doc)?).await?;
        Ok(InsertAck {
            inserted_ids: vec![result.inserted_id.into_relaxed_extjson()],
        })
    }

    async fn create_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<InsertAck, StoreError> {
        if docs.is_empty() {
            return Ok(InsertAck {
                inserted_ids: Vec::new(),
            });
        }

        let docs = docs.iter().map(to_bson).collect::<Result<Vec<_>, _>>()?;
        let result = self.collection(collection).insert_many(docs).await?;

        let mut ids: Vec<_> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(index, _)| *index);
        Ok(InsertAck {
            inserted_ids: ids
                .into_iter()
                .map(|(_, id)| id.into_relaxed_extjson())
                .collect(),
        })
    }

    async fn get_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, StoreError> {
        let found = self.collection(collection).find_one(to_bson(filter)?).await?;
        Ok(found.map(from_bson))
    }

    async fn get_many(
        &self,
        collection: &str,
        filter: &Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut cursor = self
            .collection(collection)
            .find(to_bson(filter)?)
            .with_options(find_options(&options))
            .await?;

        let mut docs = Vec::new();
        while cursor.advance().await? {
            docs.push(from_bson(cursor.deserialize_current()?));
        }
        Ok(docs)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError> {
        let collection = self.collection(collection);
        let filter = to_bson(filter)?;
        let change = to_bson(update)?;

        let result = if is_replacement(update) {
            let replace = ReplaceOptions::builder().upsert(options.upsert).build();
            collection
                .replace_one(filter, change)
                .with_options(replace)
                .await?
        } else {
            let update_options = options::UpdateOptions::builder()
                .upsert(options.upsert)
                .build();
            collection
                .update_one(filter, change)
                .with_options(update_options)
                .await?
        };
        Ok(update_ack(result))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateAck, StoreError> {
        if is_replacement(update) {
            return Err(StoreError::ReplaceMany);
        }

        let update_options = options::UpdateOptions::builder()
            .upsert(options.upsert)
            .build();
        let result = self
            .collection(collection)
            .update_many(to_bson(filter)?, to_bson(update)?)
            .with_options(update_options)
            .await?;
        Ok(update_ack(result))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<DeleteAck, StoreError> {
        let result = self.collection(collection).delete_one(to_bson(filter)?).await?;
        Ok(DeleteAck {
            deleted: result.deleted_count,
        })
    }

    async fn delete_many(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<DeleteAck, StoreError> {
        let result = self
            .collection(collection)
            .delete_many(to_bson(filter)?)
            .await?;
        Ok(DeleteAck {
            deleted: result.deleted_count,
        })
    }
}
