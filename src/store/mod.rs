pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::{Bson, Document};

use crate::error::StoreResult;

pub use memory::{MemoryBackend, MemoryStore};

/// Lazy, single-pass sequence of documents in store-defined order.
pub type DocumentCursor = BoxStream<'static, StoreResult<Document>>;

/// Document-oriented view of a database connection.
///
/// Implementations own the connection; `close` releases it.
#[async_trait]
pub trait DocumentStore: Send {
    /// Create `name` if it does not exist yet. Safe to call repeatedly.
    async fn ensure_collection(&mut self, name: &str) -> StoreResult<()>;

    /// Insert one document and return the id the store assigned to it.
    async fn insert_one(&mut self, collection: &str, document: Document) -> StoreResult<String>;

    /// Make every write issued so far durable.
    async fn commit(&mut self) -> StoreResult<()>;

    async fn find_all(&mut self, collection: &str) -> StoreResult<DocumentCursor>;

    async fn close(&mut self) -> StoreResult<()>;
}

pub(crate) fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
