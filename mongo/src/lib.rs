//! MongoDB-based document store.
//!
//! Holds the schema-free collections `personNotes`, `parentContacts`,
//! `eventNotes` and `eventTypes`. Documents are stored as given; the only
//! fields this gateway manages are `_id` (exposed as an opaque hex string),
//! `created` and `updated` (BSON datetimes).
//!
//! # Example
//!
//! ```no_run
//! use youthgroup_mongo::MongoDocumentStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MongoDocumentStore::connect("mongodb://localhost:27017", "youthgroup").await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, DateTime as BsonDateTime, Document as BsonDocument, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Database};
use serde_json::Value;
use std::sync::Arc;
use youthgroup_core::documents::{Collection, Document, DocumentFilter, Fields};
use youthgroup_core::environment::{Clock, SystemClock};
use youthgroup_core::stores::{DocumentStore, StoreFuture};
use youthgroup_core::{Result, YouthGroupError};

/// Document store backed by one MongoDB database.
#[derive(Clone)]
pub struct MongoDocumentStore {
    database: Database,
    clock: Arc<dyn Clock>,
}

impl MongoDocumentStore {
    /// Connects to `uri` and selects `database`.
    ///
    /// The driver connects lazily; this verifies the server with a ping.
    ///
    /// # Errors
    ///
    /// Returns a document store error if the URI is invalid or the server
    /// does not answer.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| YouthGroupError::document(format!("Failed to create MongoDB client: {e}")))?;
        let store = Self::from_database(client.database(database));
        store.ping().await?;

        tracing::info!(database, "Connected to MongoDB document store");
        Ok(store)
    }

    /// Wraps an existing database handle.
    #[must_use]
    pub fn from_database(database: Database) -> Self {
        Self {
            database,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for `created`/`updated` stamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<BsonDocument> {
        self.database.collection(collection.name())
    }

    fn stamp(&self) -> BsonDateTime {
        BsonDateTime::from_millis(self.clock.now().timestamp_millis())
    }
}

/// Ids written by this gateway are ObjectIds; anything else is matched
/// as a plain string.
fn id_filter(id: &str) -> BsonDocument {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": oid },
        Err(_) => doc! { "_id": id },
    }
}

fn to_filter(filter: &DocumentFilter) -> Result<BsonDocument> {
    match filter {
        DocumentFilter::All => Ok(BsonDocument::new()),
        DocumentFilter::Field { name, value } => {
            let value = bson::to_bson(value)
                .map_err(|e| YouthGroupError::document(format!("Invalid filter value: {e}")))?;
            let mut filter = BsonDocument::new();
            filter.insert(name.clone(), value);
            Ok(filter)
        }
    }
}

fn to_bson_fields(fields: &Fields) -> Result<BsonDocument> {
    bson::to_document(fields)
        .map_err(|e| YouthGroupError::document(format!("Failed to encode document: {e}")))
}

fn take_timestamp(doc: &mut BsonDocument, key: &str) -> Option<DateTime<Utc>> {
    match doc.remove(key)? {
        Bson::DateTime(dt) => DateTime::from_timestamp_millis(dt.timestamp_millis()),
        Bson::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

fn from_bson(mut doc: BsonDocument) -> Document {
    let id = match doc.remove("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let created = take_timestamp(&mut doc, "created");
    let updated = take_timestamp(&mut doc, "updated");
    let fields = match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Fields::new(),
    };
    Document {
        id,
        fields,
        created,
        updated,
    }
}

impl DocumentStore for MongoDocumentStore {
    fn find(&self, collection: Collection, filter: DocumentFilter) -> StoreFuture<'_, Vec<Document>> {
        Box::pin(async move {
            let filter = to_filter(&filter)?;
            let cursor = self
                .collection(collection)
                .find(filter)
                .sort(doc! { "_id": 1 })
                .await
                .map_err(|e| YouthGroupError::document(format!("Failed to query {collection}: {e}")))?;
            let docs: Vec<BsonDocument> = cursor
                .try_collect()
                .await
                .map_err(|e| YouthGroupError::document(format!("Failed to read {collection}: {e}")))?;

            Ok(docs.into_iter().map(from_bson).collect())
        })
    }

    fn insert(&self, collection: Collection, fields: Fields) -> StoreFuture<'_, String> {
        Box::pin(async move {
            let mut doc = to_bson_fields(&fields)?;
            doc.insert("created", self.stamp());

            let result = self
                .collection(collection)
                .insert_one(doc)
                .await
                .map_err(|e| YouthGroupError::document(format!("Failed to insert into {collection}: {e}")))?;

            let id = match result.inserted_id {
                Bson::ObjectId(oid) => oid.to_hex(),
                Bson::String(s) => s,
                other => other.to_string(),
            };
            tracing::debug!(collection = %collection, id = %id, "Inserted document");
            Ok(id)
        })
    }

    fn update(&self, collection: Collection, id: &str, fields: Fields) -> StoreFuture<'_, Document> {
        let id = id.to_string();
        Box::pin(async move {
            let mut set = to_bson_fields(&fields)?;
            set.insert("updated", self.stamp());

            let updated = self
                .collection(collection)
                .find_one_and_update(id_filter(&id), doc! { "$set": set })
                .return_document(ReturnDocument::After)
                .await
                .map_err(|e| YouthGroupError::document(format!("Failed to update {collection}: {e}")))?;

            updated
                .map(from_bson)
                .ok_or_else(|| YouthGroupError::not_found(collection.resource(), &id))
        })
    }

    fn delete(&self, collection: Collection, id: &str) -> StoreFuture<'_, ()> {
        let id = id.to_string();
        Box::pin(async move {
            let result = self
                .collection(collection)
                .delete_one(id_filter(&id))
                .await
                .map_err(|e| YouthGroupError::document(format!("Failed to delete from {collection}: {e}")))?;

            if result.deleted_count == 0 {
                return Err(YouthGroupError::not_found(collection.resource(), &id));
            }
            Ok(())
        })
    }

    fn delete_matching(&self, collection: Collection, filter: DocumentFilter) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let filter = to_filter(&filter)?;
            let result = self
                .collection(collection)
                .delete_many(filter)
                .await
                .map_err(|e| YouthGroupError::document(format!("Failed to delete from {collection}: {e}")))?;
            Ok(result.deleted_count)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.database
                .run_command(doc! { "ping": 1 })
                .await
                .map_err(|e| YouthGroupError::document(format!("MongoDB ping failed: {e}")))?;
            Ok(())
        })
    }
}
