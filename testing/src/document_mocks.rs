//! In-memory document store.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use youthgroup_core::documents::{Collection, Document, DocumentFilter, Fields};
use youthgroup_core::environment::Clock;
use youthgroup_core::stores::{DocumentStore, StoreFuture};
use youthgroup_core::{Result, YouthGroupError};

use crate::mocks::test_clock;

/// `HashMap`-backed [`DocumentStore`] with uuid ids.
///
/// Documents keep insertion order within a collection. `created` and
/// `updated` come from the injected clock so tests can assert on them.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<Collection, Vec<Document>>>>,
    clock: Arc<dyn Clock>,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Create an empty store stamped by [`test_clock`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(test_clock()))
    }

    /// Create an empty store stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            clock,
            failing: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every subsequent call fail with a document store error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of gateway calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of documents in `collection`.
    #[must_use]
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(&collection)
            .map_or(0, Vec::len)
    }

    fn guard(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(YouthGroupError::document("simulated document store outage"));
        }
        Ok(())
    }

    fn with_collection<T, F>(&self, collection: Collection, f: F) -> StoreFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<Document>) -> Result<T>,
    {
        let result = self.guard().and_then(|()| {
            let mut collections = self.collections.write().unwrap();
            f(collections.entry(collection).or_default())
        });
        Box::pin(std::future::ready(result))
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("collections", &self.collections)
            .finish_non_exhaustive()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn find(&self, collection: Collection, filter: DocumentFilter) -> StoreFuture<'_, Vec<Document>> {
        self.with_collection(collection, move |docs| {
            Ok(docs
                .iter()
                .filter(|doc| filter.matches(&doc.fields))
                .cloned()
                .collect())
        })
    }

    fn insert(&self, collection: Collection, fields: Fields) -> StoreFuture<'_, String> {
        let now = self.clock.now();
        self.with_collection(collection, move |docs| {
            let id = uuid::Uuid::new_v4().simple().to_string();
            docs.push(Document {
                id: id.clone(),
                fields,
                created: Some(now),
                updated: None,
            });
            Ok(id)
        })
    }

    fn update(&self, collection: Collection, id: &str, fields: Fields) -> StoreFuture<'_, Document> {
        let now = self.clock.now();
        let id = id.to_string();
        self.with_collection(collection, move |docs| {
            let doc = docs
                .iter_mut()
                .find(|doc| doc.id == id)
                .ok_or_else(|| YouthGroupError::not_found(collection.resource(), id.clone()))?;
            doc.fields.extend(fields);
            doc.updated = Some(now);
            Ok(doc.clone())
        })
    }

    fn delete(&self, collection: Collection, id: &str) -> StoreFuture<'_, ()> {
        let id = id.to_string();
        self.with_collection(collection, move |docs| {
            let before = docs.len();
            docs.retain(|doc| doc.id != id);
            if docs.len() == before {
                return Err(YouthGroupError::not_found(collection.resource(), id));
            }
            Ok(())
        })
    }

    fn delete_matching(&self, collection: Collection, filter: DocumentFilter) -> StoreFuture<'_, u64> {
        self.with_collection(collection, move |docs| {
            let before = docs.len();
            docs.retain(|doc| !filter.matches(&doc.fields));
            Ok((before - docs.len()) as u64)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(std::future::ready(self.guard()))
    }
}
