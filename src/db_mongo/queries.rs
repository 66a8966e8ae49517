use mongodb::{
    ClientSession, Collection, Cursor, Database,
    bson::{Bson, Document, doc},
    error::{ErrorKind, Result},
};

/// Server reply code for creating a collection that already exists
const NAMESPACE_EXISTS: i32 = 48;

/// Create `name` unless it already exists. Returns whether it was created.
pub async fn ensure_collection(db: &Database, name: &str) -> Result<bool> {
    let existing = db
        .list_collection_names()
        .filter(doc! { "name": name })
        .await?;
    if !existing.is_empty() {
        return Ok(false);
    }

    match db.create_collection(name).await {
        Ok(()) => Ok(true),
        // Lost a race with another client creating the same collection
        Err(e) if is_namespace_exists(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

pub async fn insert_document(
    collection: &Collection<Document>,
    document: Document,
    session: Option<&mut ClientSession>,
) -> Result<Bson> {
    let result = match session {
        Some(session) => collection.insert_one(document).session(session).await?,
        None => collection.insert_one(document).await?,
    };

    Ok(result.inserted_id)
}

/// Open a cursor over every document; no ordering is requested
pub async fn find_all(collection: &Collection<Document>) -> Result<Cursor<Document>> {
    collection.find(doc! {}).await
}

fn is_namespace_exists(err: &mongodb::error::Error) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(e) if e.code == NAMESPACE_EXISTS)
}
