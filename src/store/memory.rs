use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{Document, doc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DocumentCursor, DocumentStore};
use crate::error::{StoreError, StoreResult};

/// Shared in-process database. Each `connect` yields an independent
/// connection over the same committed data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> MemoryStore {
        MemoryStore {
            backend: self.clone(),
            pending: Vec::new(),
            closed: false,
        }
    }

    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Committed documents of `name`, empty when the collection is absent
    pub async fn documents(&self, name: &str) -> Vec<Document> {
        self.collections
            .lock()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

/// One connection to a `MemoryBackend`. Inserts stay pending until `commit`.
pub struct MemoryStore {
    backend: MemoryBackend,
    pending: Vec<(String, Document)>,
    closed: bool,
}

impl MemoryStore {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&mut self, name: &str) -> StoreResult<()> {
        self.check_open()?;
        self.backend
            .collections
            .lock()
            .await
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn insert_one(&mut self, collection: &str, document: Document) -> StoreResult<String> {
        self.check_open()?;
        if !self.backend.collections.lock().await.contains_key(collection) {
            return Err(StoreError::Backend(format!(
                "collection {} does not exist",
                collection
            )));
        }

        let id = Uuid::new_v4().to_string();
        let mut stored = doc! { "_id": id.clone() };
        for (key, value) in document {
            if key != "_id" {
                stored.insert(key, value);
            }
        }
        self.pending.push((collection.to_string(), stored));
        Ok(id)
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.check_open()?;
        let mut collections = self.backend.collections.lock().await;
        for (name, document) in self.pending.drain(..) {
            collections.entry(name).or_default().push(document);
        }
        Ok(())
    }

    async fn find_all(&mut self, collection: &str) -> StoreResult<DocumentCursor> {
        self.check_open()?;
        let documents = self.backend.documents(collection).await;
        Ok(futures::stream::iter(documents.into_iter().map(Ok)).boxed())
    }

    async fn close(&mut self) -> StoreResult<()> {
        // Uncommitted writes are rolled back.
        self.pending.clear();
        self.closed = true;
        Ok(())
    }
}
